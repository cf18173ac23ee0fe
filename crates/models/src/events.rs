use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{OrbitalError, Result};

/// A point on the map, in decimal degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);

        if !valid {
            return Err(OrbitalError::InvalidCoordinates { latitude, longitude });
        }

        Ok(Self { latitude, longitude })
    }

    /// Round both axes to `places` decimal places.
    pub fn rounded(self, places: i32) -> Self {
        let factor = 10f64.powi(places);
        Self {
            latitude: (self.latitude * factor).round() / factor,
            longitude: (self.longitude * factor).round() / factor,
        }
    }
}

/// One real-time datapoint destined for the map.
///
/// Events are immutable once built and are shared read-only between every
/// subscriber that receives them. On the wire (both the inbound datagram and
/// the outbound stream) an event is the JSON array
/// `[latitude, longitude, timestamp_ms, "platform"]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "WireEvent", into = "WireEvent")]
pub struct Event {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp_ms: i64,
    pub platform: String,
}

#[derive(Serialize, Deserialize)]
struct WireEvent(f64, f64, i64, String);

impl TryFrom<WireEvent> for Event {
    type Error = OrbitalError;

    fn try_from(WireEvent(latitude, longitude, timestamp_ms, platform): WireEvent) -> Result<Self> {
        let coordinates = Coordinates::new(latitude, longitude)?;
        Ok(Self::new(coordinates, timestamp_ms, platform))
    }
}

impl From<Event> for WireEvent {
    fn from(event: Event) -> Self {
        Self(event.latitude, event.longitude, event.timestamp_ms, event.platform)
    }
}

impl Event {
    pub fn new(coordinates: Coordinates, timestamp_ms: i64, platform: impl Into<String>) -> Self {
        Self {
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
            timestamp_ms,
            platform: platform.into(),
        }
    }

    /// Build an event stamped with the current wall-clock time.
    pub fn now(coordinates: Coordinates, platform: impl Into<String>) -> Self {
        Self::new(coordinates, now_ms(), platform)
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    /// Single-line textual form used by the outbound stream framing.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
