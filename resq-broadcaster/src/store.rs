//! Per-channel state storage
//!
//! Each channel sits behind its own lock. A write replaces the whole value;
//! a snapshot reads every channel in turn, so it is atomic per channel but
//! not across channels.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

use crate::events::ChannelValues;

/// Current value of one channel
#[derive(Debug)]
pub(crate) struct ChannelSlot {
    value: Arc<Value>,
}

impl ChannelSlot {
    fn new() -> Self {
        Self {
            value: Arc::new(default_value()),
        }
    }

    pub(crate) fn value(&self) -> Arc<Value> {
        Arc::clone(&self.value)
    }

    pub(crate) fn replace(&mut self, value: Arc<Value>) {
        self.value = value;
    }
}

/// Value of a channel nobody has published to yet
pub fn default_value() -> Value {
    Value::Array(Vec::new())
}

pub struct StateStore {
    slots: RwLock<BTreeMap<String, Arc<Mutex<ChannelSlot>>>>,
}

impl StateStore {
    /// Create a store with every channel set to its default value
    pub fn new<I, S>(channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let slots = channels
            .into_iter()
            .map(|name| (name.into(), Arc::new(Mutex::new(ChannelSlot::new()))))
            .collect();

        Self {
            slots: RwLock::new(slots),
        }
    }

    /// Last value written to `channel`, or the default
    pub async fn get(&self, channel: &str) -> Arc<Value> {
        match self.slot(channel).await {
            Some(slot) => slot.lock().await.value(),
            None => Arc::new(default_value()),
        }
    }

    /// Replace the value of `channel`, creating the channel if needed
    pub async fn set(&self, channel: &str, value: Value) {
        let slot = self.slot_or_insert(channel).await;
        slot.lock().await.replace(Arc::new(value));
    }

    /// Copy of every channel's current value
    pub async fn snapshot(&self) -> ChannelValues {
        let mut values = ChannelValues::new();
        for (name, slot) in self.slots().await {
            let value = slot.lock().await.value();
            values.insert(name, value);
        }
        values
    }

    /// Names of all known channels, in lock order
    pub async fn channels(&self) -> Vec<String> {
        self.slots.read().await.keys().cloned().collect()
    }

    pub(crate) async fn slot(&self, channel: &str) -> Option<Arc<Mutex<ChannelSlot>>> {
        self.slots.read().await.get(channel).cloned()
    }

    /// All slots sorted by name. Callers locking several slots must take
    /// them in this order.
    pub(crate) async fn slots(&self) -> Vec<(String, Arc<Mutex<ChannelSlot>>)> {
        self.slots
            .read()
            .await
            .iter()
            .map(|(name, slot)| (name.clone(), Arc::clone(slot)))
            .collect()
    }

    async fn slot_or_insert(&self, channel: &str) -> Arc<Mutex<ChannelSlot>> {
        if let Some(slot) = self.slot(channel).await {
            return slot;
        }
        let mut slots = self.slots.write().await;
        Arc::clone(
            slots
                .entry(channel.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(ChannelSlot::new()))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_unpublished_channel_returns_default() {
        let store = StateStore::new(["risk_zones"]);
        assert_eq!(*store.get("risk_zones").await, json!([]));
        assert_eq!(*store.get("never_configured").await, json!([]));
    }

    #[tokio::test]
    async fn test_set_replaces_value() {
        let store = StateStore::new(["risk_zones"]);
        store.set("risk_zones", json!([{"id": "A"}])).await;
        store.set("risk_zones", json!([{"id": "A"}, {"id": "B"}])).await;

        assert_eq!(*store.get("risk_zones").await, json!([{"id": "A"}, {"id": "B"}]));
    }

    #[tokio::test]
    async fn test_set_unknown_channel_creates_it() {
        let store = StateStore::new(["risk_zones"]);
        store.set("flood_gauges", json!([1, 2])).await;

        assert_eq!(store.channels().await, vec!["flood_gauges", "risk_zones"]);
        assert_eq!(*store.get("flood_gauges").await, json!([1, 2]));
    }

    #[tokio::test]
    async fn test_snapshot_covers_every_channel() {
        let store = StateStore::new(["risk_zones", "vehicle_positions", "disaster_overlays"]);
        store.set("vehicle_positions", json!([{"id": "v1"}])).await;

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.len(), 3);
        assert_eq!(*snapshot["vehicle_positions"], json!([{"id": "v1"}]));
        assert_eq!(*snapshot["risk_zones"], json!([]));
    }

    #[tokio::test]
    async fn test_concurrent_writers_leave_one_whole_value() {
        let store = Arc::new(StateStore::new(["vehicle_positions"]));
        let mut tasks = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store.set("vehicle_positions", json!([i, i, i])).await;
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let value = store.get("vehicle_positions").await;
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|item| item == &items[0]));
    }
}
