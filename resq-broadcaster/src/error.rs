use thiserror::Error;

use crate::registry::SubscriberId;

/// Why a message could not be handed to a subscriber's queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailure {
    /// Outbound queue is at capacity (slow consumer)
    QueueFull,
    /// Receiving side of the queue was dropped
    Closed,
    /// Peer did not accept a frame within the send timeout
    Timeout,
}

impl std::fmt::Display for SendFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendFailure::QueueFull => write!(f, "outbound queue full"),
            SendFailure::Closed => write!(f, "outbound queue closed"),
            SendFailure::Timeout => write!(f, "send timed out"),
        }
    }
}

#[derive(Error, Debug)]
pub enum HubError {
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("Failed to deliver to subscriber {id}: {reason}")]
    SubscriberSendFailure { id: SubscriberId, reason: SendFailure },

    #[error("Malformed upstream event: {0}")]
    MalformedUpstreamEvent(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid hub configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, HubError>;
