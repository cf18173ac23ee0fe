use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Counters for the datagram path, updated without locking.
#[derive(Debug)]
pub struct IngestMetrics {
    start_time: Instant,
    datagrams_received: AtomicU64,
    decoded: AtomicU64,
    malformed: AtomicU64,
    unlocated: AtomicU64,
    sampled_out: AtomicU64,
    events_published: AtomicU64,
    receive_errors: AtomicU64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IngestStats {
    pub uptime_seconds: u64,
    pub datagrams_received: u64,
    pub decoded: u64,
    pub malformed: u64,
    pub unlocated: u64,
    pub sampled_out: u64,
    pub events_published: u64,
    pub receive_errors: u64,
    pub events_per_second: f64,
}

impl IngestMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            datagrams_received: AtomicU64::new(0),
            decoded: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
            unlocated: AtomicU64::new(0),
            sampled_out: AtomicU64::new(0),
            events_published: AtomicU64::new(0),
            receive_errors: AtomicU64::new(0),
        }
    }

    pub fn increment_received(&self) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_decoded(&self) {
        self.decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_unlocated(&self) {
        self.unlocated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_sampled_out(&self) {
        self.sampled_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_published(&self) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_receive_errors(&self) {
        self.receive_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> IngestStats {
        let elapsed = self.start_time.elapsed();
        let events_published = self.events_published.load(Ordering::Relaxed);
        let events_per_second = if elapsed.as_secs_f64() > 0.0 {
            events_published as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        IngestStats {
            uptime_seconds: elapsed.as_secs(),
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            decoded: self.decoded.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            unlocated: self.unlocated.load(Ordering::Relaxed),
            sampled_out: self.sampled_out.load(Ordering::Relaxed),
            events_published,
            receive_errors: self.receive_errors.load(Ordering::Relaxed),
            events_per_second,
        }
    }
}

impl Default for IngestMetrics {
    fn default() -> Self {
        Self::new()
    }
}
