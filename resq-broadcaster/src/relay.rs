//! Upstream feed relay
//!
//! Turns raw events from an external producer (the traffic simulation)
//! into ordinary hub publishes, so simulated and API-driven updates share
//! one fan-out path.
//!
//! Accepted event shapes:
//!
//! - a bare JSON array: one simulation tick, replacing the full vehicle
//!   position list
//! - `{"type": "<channel>", "payload": <value>}`: a value for any
//!   configured channel

use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::{Stream, StreamExt};
use serde::Serialize;
use serde_json::Value;

use crate::config::VEHICLE_POSITIONS;
use crate::error::{HubError, Result};
use crate::events::{RawFrame, INITIAL_STATE};
use crate::hub::BroadcastHub;

/// Relay counters
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct RelayStats {
    pub relayed: u64,
    pub discarded: u64,
}

pub struct RelayAdapter {
    hub: Arc<BroadcastHub>,
    tick_channel: String,
    relayed: AtomicU64,
    discarded: AtomicU64,
}

impl RelayAdapter {
    pub fn new(hub: Arc<BroadcastHub>) -> Self {
        Self {
            hub,
            tick_channel: VEHICLE_POSITIONS.to_string(),
            relayed: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    /// Channel that bare-array ticks are published to
    pub fn with_tick_channel(mut self, channel: impl Into<String>) -> Self {
        self.tick_channel = channel.into();
        self
    }

    /// Split a raw event into its target channel and value
    pub fn parse_event(&self, raw: &str) -> Result<(String, Value)> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(HubError::MalformedUpstreamEvent("empty event".to_string()));
        }

        let value: Value = serde_json::from_str(raw)
            .map_err(|e| HubError::MalformedUpstreamEvent(format!("invalid JSON: {}", e)))?;

        let (channel, payload) = match value {
            Value::Array(_) => (self.tick_channel.clone(), value),
            Value::Object(_) => {
                let frame: RawFrame = serde_json::from_value(value).map_err(|e| {
                    HubError::MalformedUpstreamEvent(format!("invalid typed event: {}", e))
                })?;
                (frame.kind, frame.payload)
            }
            _ => {
                return Err(HubError::MalformedUpstreamEvent(
                    "expected an array or a typed object".to_string(),
                ))
            }
        };

        if channel == INITIAL_STATE || !self.hub.has_channel(&channel) {
            return Err(HubError::MalformedUpstreamEvent(format!(
                "unknown channel '{}'",
                channel
            )));
        }
        Ok((channel, payload))
    }

    /// Parse and publish one upstream event
    pub async fn on_external_event(&self, raw: &str) -> Result<usize> {
        let (channel, value) = self.parse_event(raw)?;
        self.hub.publish(&channel, value).await
    }

    /// Relay one event, logging and counting instead of failing
    pub async fn handle(&self, raw: &str) -> bool {
        match self.on_external_event(raw).await {
            Ok(queued) => {
                self.relayed.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Relayed upstream event to {} subscriber(s)", queued);
                true
            }
            Err(e) => {
                self.discarded.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Discarding upstream event: {}", e);
                false
            }
        }
    }

    /// Relay every event from `feed` until it ends
    ///
    /// A feed error ends this run only; the hub and its subscribers are
    /// untouched, so the caller can reconnect and call `run` again.
    pub async fn run<S, E>(&self, feed: S) -> RelayStats
    where
        S: Stream<Item = std::result::Result<String, E>>,
        E: Display,
    {
        let before = self.stats();
        futures::pin_mut!(feed);

        while let Some(item) = feed.next().await {
            match item {
                Ok(raw) => {
                    self.handle(&raw).await;
                }
                Err(e) => {
                    tracing::warn!("Upstream feed error: {}", e);
                    break;
                }
            }
        }

        let after = self.stats();
        tracing::info!(
            "Upstream feed ended ({} relayed, {} discarded)",
            after.relayed - before.relayed,
            after.discarded - before.discarded
        );
        RelayStats {
            relayed: after.relayed - before.relayed,
            discarded: after.discarded - before.discarded,
        }
    }

    pub fn stats(&self) -> RelayStats {
        RelayStats {
            relayed: self.relayed.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}
