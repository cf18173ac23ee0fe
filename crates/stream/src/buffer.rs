use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::queue::ArrayQueue;
use orbital_models::Event;
use tokio::sync::Notify;

pub const DEFAULT_BUFFER_CAPACITY: usize = 1000;

/// Bounded outbound queue owned by a single subscriber.
///
/// The broadcast hub is the only producer and the subscriber's stream writer
/// the only consumer. When the queue is full the oldest queued event is
/// evicted to make room, so `push` never waits on a slow reader.
#[derive(Debug)]
pub struct SubscriberBuffer {
    queue: ArrayQueue<Arc<Event>>,
    ready: Notify,
    evicted: AtomicU64,
}

impl SubscriberBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity.max(1)),
            ready: Notify::new(),
            evicted: AtomicU64::new(0),
        }
    }

    /// Enqueue an event, evicting the oldest one if the buffer is full.
    /// Returns `true` when an eviction happened.
    pub fn push(&self, event: Arc<Event>) -> bool {
        let evicted = self.queue.force_push(event).is_some();
        if evicted {
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
        self.ready.notify_one();
        evicted
    }

    pub fn pop(&self) -> Option<Arc<Event>> {
        self.queue.pop()
    }

    /// Drain whatever is queued right now, oldest first. Events pushed while
    /// draining are left for the next call.
    pub fn pop_all_available(&self) -> Vec<Arc<Event>> {
        let available = self.queue.len();
        let mut events = Vec::with_capacity(available);
        for _ in 0..available {
            match self.queue.pop() {
                Some(event) => events.push(event),
                None => break,
            }
        }
        events
    }

    /// Resolves once a push has happened since the last wake-up.
    pub async fn ready(&self) {
        self.ready.notified().await;
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}

impl Default for SubscriberBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}
