use std::collections::BTreeMap;
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// `type` tag of the snapshot frame sent first to every subscriber
pub const INITIAL_STATE: &str = "initial_state";

/// Channel name -> value, as captured by a snapshot
pub type ChannelValues = BTreeMap<String, Arc<Value>>;

/// Message delivered to map clients
///
/// Serializes to the `{"type": ..., "payload": ...}` frame existing clients
/// understand. Values are reference counted so a fan-out to many
/// subscribers shares one allocation.
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    /// Full state of every channel, sent exactly once per subscriber
    Snapshot { channels: ChannelValues },

    /// Replacement value for a single channel
    Update { channel: Arc<str>, value: Arc<Value> },
}

impl HubMessage {
    /// Wire `type` tag of this message
    pub fn kind(&self) -> &str {
        match self {
            HubMessage::Snapshot { .. } => INITIAL_STATE,
            HubMessage::Update { channel, .. } => channel.as_ref(),
        }
    }

    pub fn is_snapshot(&self) -> bool {
        matches!(self, HubMessage::Snapshot { .. })
    }

    /// Serialize into a single text frame
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a frame produced by [`HubMessage::to_json`]
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let frame: RawFrame = serde_json::from_str(text)?;
        Ok(frame.into_message())
    }
}

impl Serialize for HubMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", self.kind())?;
        match self {
            HubMessage::Snapshot { channels } => map.serialize_entry("payload", channels)?,
            HubMessage::Update { value, .. } => map.serialize_entry("payload", value)?,
        }
        map.end()
    }
}

/// Untyped `{"type", "payload"}` envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFrame {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Value,
}

impl RawFrame {
    fn into_message(self) -> HubMessage {
        if self.kind == INITIAL_STATE {
            let channels = match self.payload {
                Value::Object(map) => map.into_iter().map(|(k, v)| (k, Arc::new(v))).collect(),
                _ => ChannelValues::new(),
            };
            HubMessage::Snapshot { channels }
        } else {
            HubMessage::Update {
                channel: Arc::from(self.kind),
                value: Arc::new(self.payload),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_serialization() {
        let msg = HubMessage::Update {
            channel: Arc::from("risk_zones"),
            value: Arc::new(json!([{"id": "z1", "level": "high"}])),
        };
        let text = msg.to_json().unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["type"], "risk_zones");
        assert_eq!(parsed["payload"][0]["level"], "high");
    }

    #[test]
    fn test_snapshot_serialization() {
        let mut channels = ChannelValues::new();
        channels.insert("risk_zones".to_string(), Arc::new(json!(["A"])));
        channels.insert("vehicle_positions".to_string(), Arc::new(json!([])));
        let msg = HubMessage::Snapshot { channels };

        let parsed: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(parsed["type"], "initial_state");
        assert_eq!(parsed["payload"]["risk_zones"], json!(["A"]));
        assert_eq!(parsed["payload"]["vehicle_positions"], json!([]));
    }

    #[test]
    fn test_from_json_recovers_kind() {
        let snapshot = HubMessage::from_json(r#"{"type":"initial_state","payload":{"a":[1]}}"#).unwrap();
        assert!(snapshot.is_snapshot());

        let update = HubMessage::from_json(r#"{"type":"disaster_overlays","payload":[]}"#).unwrap();
        assert_eq!(update.kind(), "disaster_overlays");
        assert!(!update.is_snapshot());
    }
}
