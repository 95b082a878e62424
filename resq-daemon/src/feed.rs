//! Simulator process feed
//!
//! Spawns the configured simulation command and relays each stdout line.
//! When the process exits it is restarted after a delay; the hub and its
//! subscribers are unaffected.

use anyhow::{Context, Result};
use resq_broadcaster::{RelayAdapter, RelayStats};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

pub struct ProcessFeed {
    program: String,
    args: Vec<String>,
    restart_delay: Duration,
}

impl ProcessFeed {
    /// Build a feed from `[program, args...]`
    pub fn new(command: &[String], restart_delay: Duration) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            restart_delay,
        })
    }

    /// Run the simulator forever, restarting it whenever it exits
    ///
    /// Abort the task running this future to stop; the child is killed
    /// when dropped.
    pub async fn run(self, relay: Arc<RelayAdapter>) {
        loop {
            match self.run_once(&relay).await {
                Ok(stats) => tracing::info!(
                    "Simulation feed '{}' exited ({} relayed, {} discarded)",
                    self.program,
                    stats.relayed,
                    stats.discarded
                ),
                Err(e) => tracing::warn!("Simulation feed '{}' failed: {:#}", self.program, e),
            }

            tracing::info!("Restarting simulation feed in {:?}", self.restart_delay);
            tokio::time::sleep(self.restart_delay).await;
        }
    }

    /// Spawn the simulator once and relay its output until stdout closes
    pub async fn run_once(&self, relay: &RelayAdapter) -> Result<RelayStats> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn '{}'", self.program))?;

        tracing::info!("Simulation feed '{}' started (pid {:?})", self.program, child.id());

        let stdout = child
            .stdout
            .take()
            .context("Simulator stdout was not captured")?;

        // Lines are read as raw bytes so a line that is not valid UTF-8 is
        // discarded by the relay instead of ending the feed. Only a read
        // error ends the stream early.
        let reader = BufReader::new(stdout);
        let feed = futures::stream::unfold((reader, Vec::new()), |(mut reader, mut buf)| async move {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => None,
                Ok(_) => {
                    let line = decode_line(&buf);
                    Some((Ok(line), (reader, buf)))
                }
                Err(e) => Some((Err(e), (reader, buf))),
            }
        });

        let stats = relay.run(feed).await;

        let status = child.wait().await.context("Failed to wait for simulator")?;
        if !status.success() {
            tracing::warn!("Simulation feed '{}' exited with {}", self.program, status);
        }
        Ok(stats)
    }
}

/// Strip the line terminator and decode, replacing invalid UTF-8
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
