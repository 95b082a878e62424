//! Configuration management

use anyhow::{bail, Context, Result};
use resq_broadcaster::HubConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upstream simulation feed configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    /// Expose the `/relay` WebSocket endpoint for the simulator
    pub enabled: bool,

    /// Simulator command whose stdout lines are relayed (program + args)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_command: Option<Vec<String>>,

    /// Delay before respawning the feed command after it exits
    pub restart_delay_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            feed_command: None,
            restart_delay_ms: 2000,
        }
    }
}

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DaemonConfig {
    /// Path to configuration file
    #[serde(skip)]
    pub config_path: PathBuf,

    /// HTTP/WebSocket listen address
    pub bind_addr: String,

    /// Log filter used when RUST_LOG is not set
    pub log_level: String,

    /// How long a client may take to accept one frame before it is dropped
    pub send_timeout_ms: u64,

    /// Allow any origin (map clients are served from elsewhere)
    pub cors_permissive: bool,

    /// Channels and per-client queue size
    pub hub: HubConfig,

    pub relay: RelayConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            config_path: Self::default_config_path(),
            bind_addr: "0.0.0.0:8000".to_string(),
            log_level: "info".to_string(),
            send_timeout_ms: 5000,
            cors_permissive: true,
            hub: HubConfig::default(),
            relay: RelayConfig::default(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default path, or create it
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_config_path())
    }

    /// Load configuration from `config_path`, writing defaults if missing
    pub fn load_from(config_path: impl AsRef<Path>) -> Result<Self> {
        let config_path = config_path.as_ref().to_path_buf();

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file {}", config_path.display()))?;

            let mut config: DaemonConfig = toml::from_str(&contents)
                .context("Failed to parse config file")?;

            config.config_path = config_path;
            Ok(config)
        } else {
            let config = Self {
                config_path,
                ..Self::default()
            };
            config.save()
                .context("Failed to save default config")?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(&self.config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.hub.validate().context("Invalid [hub] section")?;

        if self.send_timeout_ms == 0 {
            bail!("send_timeout_ms must be greater than 0");
        }
        if let Some(command) = &self.relay.feed_command {
            if command.is_empty() || command[0].trim().is_empty() {
                bail!("relay.feed_command must name a program");
            }
        }
        Ok(())
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.relay.restart_delay_ms)
    }

    /// Get default config path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("resq")
            .join("config.toml")
    }
}
