use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Point-in-time hub counters
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HubStats {
    pub subscribers: usize,
    pub publishes: u64,
    pub messages_queued: u64,
    pub subscribers_dropped: u64,
    pub last_publish_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub(crate) struct HubCounters {
    publishes: AtomicU64,
    messages_queued: AtomicU64,
    subscribers_dropped: AtomicU64,
    last_publish_ms: AtomicI64,
}

impl HubCounters {
    pub(crate) fn record_publish(&self, queued: usize) {
        self.publishes.fetch_add(1, Ordering::Relaxed);
        self.messages_queued.fetch_add(queued as u64, Ordering::Relaxed);
        self.last_publish_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    pub(crate) fn record_drop(&self) {
        self.subscribers_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, subscribers: usize) -> HubStats {
        let last_ms = self.last_publish_ms.load(Ordering::Relaxed);
        HubStats {
            subscribers,
            publishes: self.publishes.load(Ordering::Relaxed),
            messages_queued: self.messages_queued.load(Ordering::Relaxed),
            subscribers_dropped: self.subscribers_dropped.load(Ordering::Relaxed),
            last_publish_at: if last_ms == 0 {
                None
            } else {
                DateTime::from_timestamp_millis(last_ms)
            },
        }
    }
}
