use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use orbital_geo::Geolocator;
use orbital_models::{Datagram, Event};
use orbital_stream::BroadcastHub;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use crate::metrics::IngestMetrics;

/// Decimal places kept for server-side geolocated coordinates.
const COORDINATE_PRECISION: i32 = 4;

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub bind_addr: SocketAddr,
    /// Fraction of decoded datagrams forwarded to subscribers, in `[0, 1]`.
    pub sample_rate: f64,
    pub max_datagram_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5556)),
            sample_rate: 1.0,
            max_datagram_size: 512,
        }
    }
}

/// What became of one inbound datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Published,
    Malformed,
    Unlocated,
    SampledOut,
}

/// Receives datagrams, turns them into events and hands them to the hub.
pub struct IngestListener {
    socket: UdpSocket,
    hub: BroadcastHub,
    geolocator: Arc<dyn Geolocator>,
    metrics: Arc<IngestMetrics>,
    config: IngestConfig,
    rng: SmallRng,
}

impl IngestListener {
    pub async fn bind(
        config: IngestConfig,
        hub: BroadcastHub,
        geolocator: Arc<dyn Geolocator>,
        metrics: Arc<IngestMetrics>,
    ) -> Result<Self> {
        let socket = UdpSocket::bind(config.bind_addr)
            .await
            .with_context(|| format!("failed to bind UDP ingest socket on {}", config.bind_addr))?;

        let config = IngestConfig {
            sample_rate: sanitize_sample_rate(config.sample_rate),
            max_datagram_size: config.max_datagram_size.max(1),
            ..config
        };

        Ok(Self {
            socket,
            hub,
            geolocator,
            metrics,
            config,
            rng: SmallRng::from_entropy(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        tracing::info!("📡 Ingest listening on udp://{}", self.local_addr()?);
        tracing::info!("🎲 Sample rate: {}", self.config.sample_rate);

        let mut buf = vec![0u8; self.config.max_datagram_size];

        loop {
            let received = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                received = self.socket.recv_from(&mut buf) => received,
            };

            match received {
                Ok((len, peer)) => {
                    let outcome = self.ingest(&buf[..len]);
                    tracing::trace!(%peer, len, ?outcome, "Datagram handled");
                }
                Err(e) => {
                    // Per-datagram receive errors (e.g. ICMP unreachable) are not fatal.
                    self.metrics.increment_receive_errors();
                    tracing::debug!(error = %e, "UDP receive error");
                }
            }
        }

        tracing::info!("Ingest listener stopped");
        Ok(())
    }

    /// Decode, enrich and publish one payload. Never blocks on subscribers.
    pub fn ingest(&mut self, payload: &[u8]) -> IngestOutcome {
        self.metrics.increment_received();

        let datagram = match Datagram::decode(payload) {
            Ok(datagram) => datagram,
            Err(e) => {
                self.metrics.increment_malformed();
                tracing::debug!(error = %e, "Dropping malformed datagram");
                return IngestOutcome::Malformed;
            }
        };

        self.metrics.increment_decoded();

        if !self.sampled() {
            self.metrics.increment_sampled_out();
            return IngestOutcome::SampledOut;
        }

        let Some(event) = self.resolve(datagram) else {
            self.metrics.increment_unlocated();
            return IngestOutcome::Unlocated;
        };

        self.hub.publish(event);
        self.metrics.increment_published();
        IngestOutcome::Published
    }

    fn sampled(&mut self) -> bool {
        self.config.sample_rate >= 1.0 || self.rng.gen::<f64>() < self.config.sample_rate
    }

    fn resolve(&self, datagram: Datagram) -> Option<Event> {
        match datagram {
            Datagram::Located(event) => Some(event),
            Datagram::Addressed { address, platform } => {
                let Some(coordinates) = self.geolocator.lookup(address) else {
                    tracing::debug!(%address, "Dropping datagram with unknown location");
                    return None;
                };
                Some(Event::now(coordinates.rounded(COORDINATE_PRECISION), platform))
            }
        }
    }
}

/// Clamp to `[0, 1]`. A non-finite rate would silently reject everything, so it
/// falls back to forwarding all datagrams.
fn sanitize_sample_rate(rate: f64) -> f64 {
    if rate.is_finite() {
        rate.clamp(0.0, 1.0)
    } else {
        tracing::warn!(rate, "Non-finite sample rate, forwarding every datagram");
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbital_geo::{DisabledGeolocator, RangeTableGeolocator};
    use std::time::Duration;

    const DATASET: &str = r#"[
        {"start": "203.0.113.0", "end": "203.0.113.255", "latitude": 37.774929, "longitude": -122.419416}
    ]"#;

    async fn listener(hub: &BroadcastHub, geolocator: Arc<dyn Geolocator>, sample_rate: f64) -> IngestListener {
        let config = IngestConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            sample_rate,
            ..IngestConfig::default()
        };
        IngestListener::bind(config, hub.clone(), geolocator, Arc::new(IngestMetrics::new()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_located_datagram_published_unchanged() {
        let hub = BroadcastHub::new(8);
        let subscriber = hub.subscribe(None);
        let mut listener = listener(&hub, Arc::new(DisabledGeolocator), 1.0).await;

        let outcome = listener.ingest(br#"[37.77,-122.41,1000,"python"]"#);

        assert_eq!(outcome, IngestOutcome::Published);
        let event = subscriber.try_recv().unwrap();
        assert_eq!(event.timestamp_ms, 1000);
        assert_eq!(event.platform, "python");
    }

    #[tokio::test]
    async fn test_addressed_datagram_geolocated() {
        let hub = BroadcastHub::new(8);
        let subscriber = hub.subscribe(None);
        let table = RangeTableGeolocator::from_json(DATASET.as_bytes()).unwrap();
        let mut listener = listener(&hub, Arc::new(table), 1.0).await;

        let before = orbital_models::now_ms();
        let outcome = listener.ingest(br#"{"ip": "203.0.113.9", "platform": "Java"}"#);

        assert_eq!(outcome, IngestOutcome::Published);
        let event = subscriber.try_recv().unwrap();
        assert_eq!(event.latitude, 37.7749);
        assert_eq!(event.longitude, -122.4194);
        assert_eq!(event.platform, "java");
        assert!(event.timestamp_ms >= before);
    }

    #[tokio::test]
    async fn test_unknown_address_dropped() {
        let hub = BroadcastHub::new(8);
        let subscriber = hub.subscribe(None);
        let mut listener = listener(&hub, Arc::new(DisabledGeolocator), 1.0).await;

        let outcome = listener.ingest(br#"{"ip": "198.51.100.1"}"#);

        assert_eq!(outcome, IngestOutcome::Unlocated);
        assert!(subscriber.try_recv().is_none());
        assert_eq!(listener.metrics.snapshot().unlocated, 1);
    }

    #[tokio::test]
    async fn test_malformed_then_valid() {
        let hub = BroadcastHub::new(8);
        let subscriber = hub.subscribe(None);
        let mut listener = listener(&hub, Arc::new(DisabledGeolocator), 1.0).await;

        assert_eq!(listener.ingest(b"\x00\x01garbage"), IngestOutcome::Malformed);
        assert_eq!(listener.ingest(br#"[1,2,3,"go"]"#), IngestOutcome::Published);

        let received: Vec<_> = subscriber.drain().iter().map(|e| e.timestamp_ms).collect();
        assert_eq!(received, vec![3]);
    }

    #[tokio::test]
    async fn test_zero_sample_rate_drops_everything() {
        let hub = BroadcastHub::new(8);
        let subscriber = hub.subscribe(None);
        let mut listener = listener(&hub, Arc::new(DisabledGeolocator), 0.0).await;

        for _ in 0..10 {
            assert_eq!(listener.ingest(br#"[1,2,3,"go"]"#), IngestOutcome::SampledOut);
        }
        assert!(subscriber.try_recv().is_none());
        assert_eq!(listener.metrics.snapshot().decoded, 10);
    }

    #[tokio::test]
    async fn test_out_of_range_sample_rates_clamped() {
        let hub = BroadcastHub::new(8);

        let above = listener(&hub, Arc::new(DisabledGeolocator), 1.5).await;
        assert_eq!(above.config.sample_rate, 1.0);

        let below = listener(&hub, Arc::new(DisabledGeolocator), -0.2).await;
        assert_eq!(below.config.sample_rate, 0.0);
    }

    #[tokio::test]
    async fn test_nan_sample_rate_forwards_everything() {
        let hub = BroadcastHub::new(8);
        let subscriber = hub.subscribe(None);
        let mut listener = listener(&hub, Arc::new(DisabledGeolocator), f64::NAN).await;

        assert_eq!(listener.config.sample_rate, 1.0);
        for _ in 0..5 {
            assert_eq!(listener.ingest(br#"[1,2,3,"go"]"#), IngestOutcome::Published);
        }
        assert_eq!(subscriber.drain().len(), 5);
    }

    #[tokio::test]
    async fn test_decoded_counts_only_well_formed() {
        let hub = BroadcastHub::new(8);
        let mut listener = listener(&hub, Arc::new(DisabledGeolocator), 1.0).await;

        listener.ingest(b"not json");
        listener.ingest(br#"[1,2,3,"go"]"#);
        listener.ingest(br#"{"ip": "198.51.100.1"}"#);

        let stats = listener.metrics.snapshot();
        assert_eq!(stats.datagrams_received, 3);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.decoded, 2);
        assert_eq!(stats.unlocated, 1);
        assert_eq!(stats.events_published, 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let hub = BroadcastHub::new(8);
        let listener = listener(&hub, Arc::new(DisabledGeolocator), 1.0).await;
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(listener.run(shutdown.clone()));
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("listener did not stop")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_bind_conflict_is_an_error() {
        let hub = BroadcastHub::new(8);
        let first = listener(&hub, Arc::new(DisabledGeolocator), 1.0).await;

        let config = IngestConfig {
            bind_addr: first.local_addr().unwrap(),
            ..IngestConfig::default()
        };
        let second =
            IngestListener::bind(config, hub, Arc::new(DisabledGeolocator), Arc::new(IngestMetrics::new())).await;

        assert!(second.is_err());
    }
}
