//! Command-line overrides

use clap::Parser;
use std::path::PathBuf;

use crate::config::DaemonConfig;

#[derive(Debug, Parser)]
#[command(name = "resq-daemon", version, about = "ResQ real-time map state hub")]
pub struct Cli {
    /// Configuration file (default: <config dir>/resq/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:8000
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Log filter when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Simulator command whose stdout is relayed, e.g. --feed-command python3 sim.py
    #[arg(long, num_args = 1.., allow_hyphen_values = true)]
    pub feed_command: Option<Vec<String>>,
}

impl Cli {
    /// Load the selected config file and apply flag overrides
    pub fn load_config(&self) -> anyhow::Result<DaemonConfig> {
        let mut config = match &self.config {
            Some(path) => DaemonConfig::load_from(path)?,
            None => DaemonConfig::load()?,
        };
        self.apply(&mut config);
        Ok(config)
    }

    pub fn apply(&self, config: &mut DaemonConfig) {
        if let Some(bind) = &self.bind {
            config.bind_addr = bind.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(command) = &self.feed_command {
            config.relay.feed_command = Some(command.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "resq-daemon",
            "--bind",
            "127.0.0.1:9000",
            "--log-level",
            "debug",
            "--feed-command",
            "python3",
            "simulation.py",
            "simple.sumocfg",
        ]);

        let mut config = DaemonConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.log_level, "debug");
        assert_eq!(
            config.relay.feed_command,
            Some(vec![
                "python3".to_string(),
                "simulation.py".to_string(),
                "simple.sumocfg".to_string()
            ])
        );
    }

    #[test]
    fn test_no_flags_leave_config_alone() {
        let cli = Cli::parse_from(["resq-daemon"]);
        let mut config = DaemonConfig::default();
        cli.apply(&mut config);
        assert_eq!(config, DaemonConfig::default());
    }
}
