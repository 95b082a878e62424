//! Real-time map state broadcaster for ResQ clients
//!
//! This crate holds the canonical map state (risk zones, vehicle positions,
//! disaster overlays) and pushes every change to any number of connected
//! clients. New clients receive a snapshot of all channels first, then each
//! later update exactly once, in publish order.
//!
//! # Features
//!
//! - Fixed set of named channels, each replaced atomically on publish
//! - Per-channel locking; snapshots are atomic per channel, not across channels
//! - Bounded per-subscriber queues; a subscriber that falls behind is dropped
//! - Removal during fan-out without affecting other subscribers
//! - Relay adapter for the traffic simulation's position feed
//!
//! # Wire Format
//!
//! - `{"type": "initial_state", "payload": {<channel>: <value>, ...}}`
//! - `{"type": "<channel>", "payload": <value>}`
//!
//! # Example Usage
//!
//! ```no_run
//! use resq_broadcaster::{BroadcastHub, HubConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hub = BroadcastHub::new(HubConfig::default())?;
//!
//!     hub.publish("risk_zones", json!([{"id": "zone-1", "level": "high"}])).await?;
//!
//!     // First message is the snapshot, then live updates
//!     let mut subscription = hub.subscribe().await;
//!     let snapshot = subscription.recv().await;
//!     println!("{}", snapshot.unwrap().to_json()?);
//!
//!     hub.publish("vehicle_positions", json!([{"id": "veh0", "x": 10.0, "y": 4.5}])).await?;
//!     let update = subscription.recv().await;
//!     println!("{}", update.unwrap().to_json()?);
//!
//!     hub.unsubscribe(subscription.id());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod hub;
pub mod registry;
pub mod relay;
pub mod stats;
pub mod store;

// Re-exports
pub use config::{
    HubConfig, DISASTER_OVERLAYS, MAX_QUEUE_CAPACITY, RISK_ZONES, VEHICLE_POSITIONS,
};
pub use error::{HubError, Result, SendFailure};
pub use events::{ChannelValues, HubMessage, RawFrame, INITIAL_STATE};
pub use hub::{BroadcastHub, Subscription};
pub use registry::{Subscriber, SubscriberId, SubscriberRegistry};
pub use relay::{RelayAdapter, RelayStats};
pub use stats::HubStats;
pub use store::StateStore;
