// Fan-out of accepted events to every live subscriber

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use orbital_models::Event;

use crate::buffer::DEFAULT_BUFFER_CAPACITY;
use crate::registry::{SubscriberInfo, SubscriberRegistry};
use crate::subscription::Subscription;

#[derive(Clone)]
pub struct BroadcastHub {
    registry: Arc<SubscriberRegistry>,
    buffer_capacity: usize,
    published: Arc<AtomicU64>,
}

impl BroadcastHub {
    pub fn new(buffer_capacity: usize) -> Self {
        Self {
            registry: Arc::new(SubscriberRegistry::new()),
            buffer_capacity: buffer_capacity.max(1),
            published: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Register a new subscriber with an empty buffer.
    pub fn subscribe(&self, remote_addr: Option<SocketAddr>) -> Subscription {
        Subscription::register(self.registry.clone(), remote_addr, self.buffer_capacity)
    }

    /// Queue `event` for every subscriber registered when the registry
    /// snapshot is taken. Never waits on a subscriber; a full buffer drops
    /// its oldest entry instead.
    pub fn publish(&self, event: Event) {
        let event = Arc::new(event);
        let subscribers = self.registry.snapshot();

        let mut evictions = 0usize;
        for buffer in &subscribers {
            if buffer.push(event.clone()) {
                evictions += 1;
            }
        }

        self.published.fetch_add(1, Ordering::Relaxed);

        if evictions > 0 {
            tracing::trace!(
                subscribers = subscribers.len(),
                evictions,
                "Published event to lagging subscribers"
            );
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    pub fn subscribers(&self) -> Vec<SubscriberInfo> {
        self.registry.describe()
    }

    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }

    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}
