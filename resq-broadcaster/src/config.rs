use serde::{Deserialize, Serialize};

use crate::error::{HubError, Result};
use crate::events::INITIAL_STATE;

pub const RISK_ZONES: &str = "risk_zones";
pub const VEHICLE_POSITIONS: &str = "vehicle_positions";
pub const DISASTER_OVERLAYS: &str = "disaster_overlays";

/// Largest accepted `queue_capacity`. Well below the bound tokio's
/// `mpsc::channel` panics on.
pub const MAX_QUEUE_CAPACITY: usize = 1 << 20;

/// Hub construction parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HubConfig {
    /// Channel names, fixed for the life of the hub
    pub channels: Vec<String>,

    /// Per-subscriber outbound queue capacity. A subscriber whose queue
    /// fills up is disconnected.
    pub queue_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            channels: vec![
                RISK_ZONES.to_string(),
                VEHICLE_POSITIONS.to_string(),
                DISASTER_OVERLAYS.to_string(),
            ],
            queue_capacity: 256,
        }
    }
}

impl HubConfig {
    pub fn validate(&self) -> Result<()> {
        if self.channels.is_empty() {
            return Err(HubError::InvalidConfig("at least one channel is required".to_string()));
        }
        if self.queue_capacity == 0 {
            return Err(HubError::InvalidConfig("queue_capacity must be greater than 0".to_string()));
        }
        if self.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(HubError::InvalidConfig(format!(
                "queue_capacity must be at most {}",
                MAX_QUEUE_CAPACITY
            )));
        }
        for (idx, name) in self.channels.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(HubError::InvalidConfig("channel names must not be empty".to_string()));
            }
            if name == INITIAL_STATE {
                return Err(HubError::InvalidConfig(format!("'{}' is reserved", INITIAL_STATE)));
            }
            if self.channels[..idx].contains(name) {
                return Err(HubError::InvalidConfig(format!("duplicate channel '{}'", name)));
            }
        }
        Ok(())
    }
}
