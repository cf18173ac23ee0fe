use std::net::SocketAddr;
use std::sync::Arc;

use orbital_models::Event;
use uuid::Uuid;

use crate::buffer::SubscriberBuffer;
use crate::registry::{SubscriberId, SubscriberRegistry};

/// One live subscriber, held by its connection for as long as it is open.
///
/// The subscription owns its buffer. Dropping it (or calling [`close`])
/// removes the subscriber from the registry exactly once, whatever path the
/// connection took to end.
///
/// [`close`]: Subscription::close
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    remote_addr: Option<SocketAddr>,
    buffer: Arc<SubscriberBuffer>,
    registry: Arc<SubscriberRegistry>,
    connected: bool,
}

impl Subscription {
    pub(crate) fn register(
        registry: Arc<SubscriberRegistry>,
        remote_addr: Option<SocketAddr>,
        capacity: usize,
    ) -> Self {
        let id = Uuid::new_v4();
        let buffer = Arc::new(SubscriberBuffer::new(capacity));
        registry.insert(id, remote_addr, &buffer);

        tracing::info!(
            subscriber = %id,
            remote = ?remote_addr,
            subscribers = registry.len(),
            "Subscriber connected"
        );

        Self {
            id,
            remote_addr,
            buffer,
            registry,
            connected: true,
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn buffer(&self) -> &SubscriberBuffer {
        &self.buffer
    }

    pub fn try_recv(&self) -> Option<Arc<Event>> {
        self.buffer.pop()
    }

    pub fn drain(&self) -> Vec<Arc<Event>> {
        self.buffer.pop_all_available()
    }

    /// Wait for the next event.
    pub async fn recv(&self) -> Arc<Event> {
        loop {
            if let Some(event) = self.buffer.pop() {
                return event;
            }
            self.buffer.ready().await;
        }
    }

    /// Unregister the subscriber. Safe to call more than once.
    pub fn close(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;
        self.registry.remove(&self.id);

        tracing::info!(
            subscriber = %self.id,
            remote = ?self.remote_addr,
            undelivered = self.buffer.len(),
            evicted = self.buffer.evicted(),
            subscribers = self.registry.len(),
            "Subscriber disconnected"
        );
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}
