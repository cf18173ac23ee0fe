use std::net::SocketAddr;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::buffer::SubscriberBuffer;

pub type SubscriberId = Uuid;

#[derive(Debug)]
struct RegisteredSubscriber {
    remote_addr: Option<SocketAddr>,
    connected_at: DateTime<Utc>,
    buffer: Weak<SubscriberBuffer>,
}

/// Point-in-time description of a live subscriber.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriberInfo {
    pub id: SubscriberId,
    pub remote_addr: Option<SocketAddr>,
    pub connected_at: DateTime<Utc>,
    pub queued: usize,
    pub evicted: u64,
}

/// The set of currently connected subscribers.
///
/// Entries hold only a weak reference to the subscriber's buffer; the
/// connection that created the buffer owns it. Insert, remove and snapshot
/// are safe to call concurrently from any task.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    subscribers: DashMap<SubscriberId, RegisteredSubscriber>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &self,
        id: SubscriberId,
        remote_addr: Option<SocketAddr>,
        buffer: &Arc<SubscriberBuffer>,
    ) {
        self.subscribers.insert(
            id,
            RegisteredSubscriber {
                remote_addr,
                connected_at: Utc::now(),
                buffer: Arc::downgrade(buffer),
            },
        );
    }

    /// Remove a subscriber. Returns `false` if it was not registered.
    pub fn remove(&self, id: &SubscriberId) -> bool {
        self.subscribers.remove(id).is_some()
    }

    pub fn contains(&self, id: &SubscriberId) -> bool {
        self.subscribers.contains_key(id)
    }

    /// Buffers of every subscriber registered at the time of the call.
    pub fn snapshot(&self) -> Vec<Arc<SubscriberBuffer>> {
        self.subscribers
            .iter()
            .filter_map(|entry| entry.value().buffer.upgrade())
            .collect()
    }

    pub fn describe(&self) -> Vec<SubscriberInfo> {
        self.subscribers
            .iter()
            .filter_map(|entry| {
                let subscriber = entry.value();
                let buffer = subscriber.buffer.upgrade()?;
                Some(SubscriberInfo {
                    id: *entry.key(),
                    remote_addr: subscriber.remote_addr,
                    connected_at: subscriber.connected_at,
                    queued: buffer.len(),
                    evicted: buffer.evicted(),
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_snapshot_remove() {
        let registry = SubscriberRegistry::new();
        let buffer = Arc::new(SubscriberBuffer::new(4));
        let id = Uuid::new_v4();

        registry.insert(id, None, &buffer);
        assert!(registry.contains(&id));
        assert_eq!(registry.snapshot().len(), 1);

        assert!(registry.remove(&id));
        assert!(!registry.remove(&id));
        assert!(registry.is_empty());
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn test_registry_does_not_own_buffers() {
        let registry = SubscriberRegistry::new();
        let buffer = Arc::new(SubscriberBuffer::new(4));
        let id = Uuid::new_v4();

        registry.insert(id, None, &buffer);
        drop(buffer);

        assert!(registry.snapshot().is_empty());
        assert!(registry.describe().is_empty());
    }

    #[test]
    fn test_describe_reports_queue_depth() {
        let registry = SubscriberRegistry::new();
        let buffer = Arc::new(SubscriberBuffer::new(4));
        let id = Uuid::new_v4();
        let addr: SocketAddr = "127.0.0.1:5000".parse().unwrap();

        registry.insert(id, Some(addr), &buffer);
        buffer.push(Arc::new(orbital_models::Event::new(
            orbital_models::Coordinates::new(1.0, 2.0).unwrap(),
            1,
            "go",
        )));

        let info = registry.describe();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].id, id);
        assert_eq!(info[0].remote_addr, Some(addr));
        assert_eq!(info[0].queued, 1);
    }
}
