use std::sync::Arc;

use futures::Stream;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::config::HubConfig;
use crate::error::{HubError, Result};
use crate::events::{ChannelValues, HubMessage};
use crate::registry::{Subscriber, SubscriberId, SubscriberRegistry};
use crate::stats::{HubCounters, HubStats};
use crate::store::StateStore;

/// Real-time map state hub
///
/// Holds the current value of every channel and fans each published value
/// out to all connected subscribers.
///
/// `publish` keeps the channel's lock while it queues the update to every
/// subscriber, and `subscribe` takes every channel lock (in name order)
/// while it registers and reads the snapshot. A publish is therefore either
/// entirely before a subscription, and only visible in its snapshot, or
/// entirely after it, and only visible as an update.
pub struct BroadcastHub {
    config: HubConfig,
    store: StateStore,
    registry: SubscriberRegistry,
    counters: HubCounters,
}

impl BroadcastHub {
    /// Create a hub with every configured channel at its default value
    pub fn new(config: HubConfig) -> Result<Self> {
        config.validate()?;
        let store = StateStore::new(config.channels.iter().cloned());

        tracing::info!(
            "Broadcast hub created with channels {:?} (queue capacity {})",
            config.channels,
            config.queue_capacity
        );

        Ok(Self {
            config,
            store,
            registry: SubscriberRegistry::new(),
            counters: HubCounters::default(),
        })
    }

    /// Replace a channel's value and queue the update to every subscriber
    ///
    /// Returns the number of subscribers the update was queued for.
    /// Subscribers whose queue is full or closed are removed.
    pub async fn publish(&self, channel: &str, value: Value) -> Result<usize> {
        if !self.has_channel(channel) {
            return Err(HubError::UnknownChannel(channel.to_string()));
        }
        let slot = self
            .store
            .slot(channel)
            .await
            .ok_or_else(|| HubError::UnknownChannel(channel.to_string()))?;

        let mut guard = slot.lock().await;
        let value = Arc::new(value);
        guard.replace(Arc::clone(&value));

        let message = HubMessage::Update {
            channel: Arc::from(channel),
            value,
        };
        let queued = self.fan_out(&message);
        drop(guard);

        self.counters.record_publish(queued);
        tracing::debug!("Published {} to {} subscriber(s)", channel, queued);
        Ok(queued)
    }

    /// Register a new subscriber
    ///
    /// The returned subscription yields the snapshot first, then every
    /// update published after registration, in publish order.
    pub async fn subscribe(&self) -> Subscription {
        let slots = self.store.slots().await;
        let mut guards = Vec::with_capacity(slots.len());
        for (_, slot) in &slots {
            guards.push(slot.lock().await);
        }

        let (tx, rx) = mpsc::channel(self.config.queue_capacity);
        let id = self.registry.add(Subscriber::new(tx));
        let snapshot: ChannelValues = slots
            .iter()
            .zip(&guards)
            .map(|((name, _), slot)| (name.clone(), slot.value()))
            .collect();
        drop(guards);

        tracing::info!("Subscriber {} connected. Total: {}", id, self.registry.len());

        Subscription {
            id,
            snapshot: Some(snapshot),
            rx,
        }
    }

    /// Remove a subscriber. Safe to call more than once.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.registry.remove(id);
        if removed {
            tracing::info!("Subscriber {} disconnected. Remaining: {}", id, self.registry.len());
        }
        removed
    }

    /// Remove a subscriber whose send path failed outside the hub
    pub fn report_failure(&self, err: &HubError) {
        if let HubError::SubscriberSendFailure { id, reason } = err {
            if self.registry.remove(*id) {
                self.counters.record_drop();
                tracing::warn!("Dropping subscriber {}: {}", id, reason);
            }
        }
    }

    /// Current value of a configured channel
    pub async fn get(&self, channel: &str) -> Result<Arc<Value>> {
        if !self.has_channel(channel) {
            return Err(HubError::UnknownChannel(channel.to_string()));
        }
        Ok(self.store.get(channel).await)
    }

    pub fn has_channel(&self, channel: &str) -> bool {
        self.config.channels.iter().any(|name| name == channel)
    }

    pub fn channels(&self) -> &[String] {
        &self.config.channels
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    pub fn stats(&self) -> HubStats {
        self.counters.snapshot(self.registry.len())
    }

    /// Disconnect every subscriber
    ///
    /// Channel state is kept; new subscribers may still connect.
    pub fn shutdown(&self) -> usize {
        let count = self.registry.clear();
        tracing::info!("Broadcast hub shut down, {} subscriber(s) disconnected", count);
        count
    }

    fn fan_out(&self, message: &HubMessage) -> usize {
        let mut queued = 0;
        self.registry.for_each(|subscriber| match subscriber.deliver(message.clone()) {
            Ok(()) => queued += 1,
            Err(reason) => {
                let err = HubError::SubscriberSendFailure {
                    id: subscriber.id(),
                    reason,
                };
                self.report_failure(&err);
            }
        });
        queued
    }
}

/// Consumer side of a hub registration
///
/// Dropping the subscription closes its queue; the hub removes it on the
/// next publish. Call [`BroadcastHub::unsubscribe`] to remove it right away.
pub struct Subscription {
    id: SubscriberId,
    snapshot: Option<ChannelValues>,
    rx: mpsc::Receiver<HubMessage>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next message: the snapshot first, then queued updates
    ///
    /// Returns `None` once the hub has removed this subscriber and the
    /// queue is drained.
    pub async fn recv(&mut self) -> Option<HubMessage> {
        if let Some(channels) = self.snapshot.take() {
            return Some(HubMessage::Snapshot { channels });
        }
        self.rx.recv().await
    }

    /// Like [`Subscription::recv`], without waiting
    pub fn try_recv(&mut self) -> Option<HubMessage> {
        if let Some(channels) = self.snapshot.take() {
            return Some(HubMessage::Snapshot { channels });
        }
        self.rx.try_recv().ok()
    }

    pub fn into_stream(self) -> impl Stream<Item = HubMessage> {
        futures::stream::unfold(self, |mut subscription| async move {
            subscription.recv().await.map(|msg| (msg, subscription))
        })
    }
}
