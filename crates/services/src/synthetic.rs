use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio::net::UdpSocket;

// Weighted towards the platforms that send the most traffic.
const PLATFORMS: &[&str] = &[
    "javascript", "javascript", "javascript", "node", "node", "node", "python", "python",
    "java", "java", "cocoa", "php", "csharp", "ruby", "go", "native", "elixir",
];

// Real cities, so synthetic points land where people are.
const CITIES: &[(f64, f64)] = &[
    (40.7, -74.0),   // New York
    (37.8, -122.4),  // San Francisco
    (51.5, -0.1),    // London
    (48.9, 2.3),     // Paris
    (52.5, 13.4),    // Berlin
    (35.7, 139.7),   // Tokyo
    (39.9, 116.4),   // Beijing
    (31.2, 121.5),   // Shanghai
    (-33.9, 151.2),  // Sydney
    (-23.5, -46.6),  // Sao Paulo
    (19.1, 72.9),    // Mumbai
    (12.9, 77.6),    // Bangalore
    (30.0, 31.2),    // Cairo
    (6.5, 3.4),      // Lagos
    (19.4, -99.1),   // Mexico City
    (-34.6, -58.4),  // Buenos Aires
    (55.8, 37.6),    // Moscow
    (41.0, 29.0),    // Istanbul
    (37.6, 127.0),   // Seoul
    (1.3, 103.8),    // Singapore
    (25.2, 55.3),    // Dubai
    (43.7, -79.4),   // Toronto
    (41.9, -87.6),   // Chicago
    (34.1, -118.2),  // Los Angeles
    (47.6, -122.3),  // Seattle
    (52.4, 4.9),     // Amsterdam
    (59.3, 18.1),    // Stockholm
    (40.4, -3.7),    // Madrid
    (22.3, 114.2),   // Hong Kong
    (-6.2, 106.8),   // Jakarta
    (-1.3, 36.8),    // Nairobi
    (-33.9, 18.4),   // Cape Town
    (4.7, -74.1),    // Bogota
    (50.1, 8.7),     // Frankfurt
    (28.6, 77.2),    // New Delhi
    (14.6, 121.0),   // Manila
    (32.1, 34.8),    // Tel Aviv
    (-36.9, 174.8),  // Auckland
    (21.3, -157.8),  // Honolulu
    (49.3, -123.1),  // Vancouver
];

/// Maximum jitter, in degrees, applied around a city centre.
const JITTER_DEGREES: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct SyntheticLoadConfig {
    pub target: SocketAddr,
    pub count: u64,
    pub interval: Duration,
}

/// Sends primary-convention datagrams at an ingest port, for exercising the
/// pipeline without a real producer.
pub struct SyntheticLoad {
    config: SyntheticLoadConfig,
    rng: SmallRng,
}

impl SyntheticLoad {
    pub fn new(config: SyntheticLoadConfig) -> Self {
        Self {
            config,
            rng: SmallRng::from_entropy(),
        }
    }

    /// Send `count` datagrams and return how many were handed to the socket.
    pub async fn run(mut self) -> Result<u64> {
        let local: SocketAddr = if self.config.target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            "[::]:0".parse()?
        };
        let socket = UdpSocket::bind(local)
            .await
            .context("failed to bind synthetic load socket")?;

        tracing::info!(
            "🎮 Sending {} synthetic datagrams to udp://{}",
            self.config.count,
            self.config.target
        );

        let mut sent = 0u64;
        for _ in 0..self.config.count {
            let payload = self.next_datagram();
            match socket.send_to(payload.as_bytes(), self.config.target).await {
                Ok(_) => sent += 1,
                Err(e) => tracing::warn!(error = %e, "Failed to send synthetic datagram"),
            }
            if !self.config.interval.is_zero() {
                tokio::time::sleep(self.config.interval).await;
            }
        }

        tracing::info!("✅ Sent {}/{} synthetic datagrams", sent, self.config.count);
        Ok(sent)
    }

    pub fn next_datagram(&mut self) -> String {
        random_datagram(&mut self.rng, orbital_models::now_ms())
    }
}

/// One `[lat, lon, ts, "platform"]` payload near a random city.
pub fn random_datagram<R: Rng>(rng: &mut R, timestamp_ms: i64) -> String {
    let (lat, lon) = CITIES.choose(rng).copied().unwrap_or((0.0, 0.0));
    let platform = PLATFORMS.choose(rng).copied().unwrap_or("other");

    let lat = (lat + rng.gen_range(-JITTER_DEGREES..JITTER_DEGREES)).clamp(-90.0, 90.0);
    let lon = (lon + rng.gen_range(-JITTER_DEGREES..JITTER_DEGREES)).clamp(-180.0, 180.0);

    format!("[{lat:.4},{lon:.4},{timestamp_ms},\"{platform}\"]")
}
