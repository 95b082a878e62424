//! Connected subscriber tracking
//!
//! The registry lock is only held to copy or mutate the map, never while a
//! caller's closure runs. That is what lets a fan-out pass remove the
//! subscriber it is currently visiting.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::error::SendFailure;
use crate::events::HubMessage;

/// Handle identifying a registered subscriber
pub type SubscriberId = u64;

/// Producer side of one client's outbound queue
#[derive(Debug, Clone)]
pub struct Subscriber {
    id: SubscriberId,
    tx: mpsc::Sender<HubMessage>,
    alive: Arc<AtomicBool>,
    connected_at: DateTime<Utc>,
}

impl Subscriber {
    pub fn new(tx: mpsc::Sender<HubMessage>) -> Self {
        Self {
            id: 0,
            tx,
            alive: Arc::new(AtomicBool::new(true)),
            connected_at: Utc::now(),
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire) && !self.tx.is_closed()
    }

    /// Queue a message without waiting
    pub fn deliver(&self, message: HubMessage) -> Result<(), SendFailure> {
        if !self.alive.load(Ordering::Acquire) {
            return Err(SendFailure::Closed);
        }
        self.tx.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendFailure::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SendFailure::Closed,
        })
    }

    fn close(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

/// Thread-safe set of live subscribers
pub struct SubscriberRegistry {
    subscribers: RwLock<BTreeMap<SubscriberId, Subscriber>>,
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Insert a subscriber and return its handle
    pub fn add(&self, mut subscriber: Subscriber) -> SubscriberId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        subscriber.id = id;

        let mut subscribers = self.write();
        subscribers.insert(id, subscriber);
        tracing::debug!("Subscriber {} registered. Total: {}", id, subscribers.len());
        id
    }

    /// Remove a subscriber. Returns false if it was already gone.
    pub fn remove(&self, id: SubscriberId) -> bool {
        let removed = self.write().remove(&id);
        match removed {
            Some(subscriber) => {
                subscriber.close();
                let connected_for = Utc::now() - subscriber.connected_at;
                tracing::debug!(
                    "Subscriber {} removed after {}s. Remaining: {}",
                    id,
                    connected_for.num_seconds(),
                    self.len()
                );
                true
            }
            None => false,
        }
    }

    /// Call `f` once for every subscriber registered when the pass starts
    ///
    /// `f` may add or remove subscribers, including the one it was handed.
    /// Subscribers removed by someone else during the pass are skipped.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&Subscriber),
    {
        let current: Vec<Subscriber> = self.read().values().cloned().collect();
        for subscriber in &current {
            if subscriber.alive.load(Ordering::Acquire) {
                f(subscriber);
            }
        }
    }

    /// Remove and close every subscriber
    pub fn clear(&self) -> usize {
        let drained = std::mem::take(&mut *self.write());
        for subscriber in drained.values() {
            subscriber.close();
        }
        drained.len()
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<SubscriberId, Subscriber>> {
        self.subscribers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<SubscriberId, Subscriber>> {
        self.subscribers.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}
