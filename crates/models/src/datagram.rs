use std::net::IpAddr;

use serde::Deserialize;

use crate::error::{OrbitalError, Result};
use crate::events::Event;

/// Platform reported for address-keyed datagrams that do not name one.
pub const DEFAULT_PLATFORM: &str = "other";

/// A decoded inbound payload.
///
/// Producers use one of two conventions. The primary one carries a fully
/// resolved event; the compatibility one carries the client address and
/// leaves geolocation to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum Datagram {
    /// `[latitude, longitude, timestamp_ms, "platform"]`
    Located(Event),
    /// `{"ip": "203.0.113.7", "platform": "python"}`
    Addressed { address: IpAddr, platform: String },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDatagram {
    Located(Event),
    Addressed {
        ip: String,
        #[serde(default)]
        platform: Option<String>,
    },
}

impl Datagram {
    /// Decode a single datagram payload. Any failure means the payload is
    /// dropped by the caller.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let payload = payload.trim_ascii();
        if payload.is_empty() {
            return Err(OrbitalError::Decode("empty payload".to_string()));
        }

        let raw: RawDatagram = serde_json::from_slice(payload)
            .map_err(|e| OrbitalError::Decode(e.to_string()))?;

        match raw {
            RawDatagram::Located(event) => Ok(Self::Located(event)),
            RawDatagram::Addressed { ip, platform } => {
                let address = ip
                    .trim()
                    .parse::<IpAddr>()
                    .map_err(|_| OrbitalError::InvalidAddress(ip.clone()))?;

                Ok(Self::Addressed {
                    address,
                    platform: normalize_platform(platform.as_deref()),
                })
            }
        }
    }

    pub fn platform(&self) -> &str {
        match self {
            Self::Located(event) => &event.platform,
            Self::Addressed { platform, .. } => platform,
        }
    }
}

fn normalize_platform(platform: Option<&str>) -> String {
    match platform.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_lowercase(),
        _ => DEFAULT_PLATFORM.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_located() {
        let datagram = Datagram::decode(br#"[37.77,-122.41,1000,"python"]"#).unwrap();

        match datagram {
            Datagram::Located(event) => {
                assert_eq!(event.latitude, 37.77);
                assert_eq!(event.longitude, -122.41);
                assert_eq!(event.timestamp_ms, 1000);
                assert_eq!(event.platform, "python");
            }
            other => panic!("expected located datagram, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_addressed() {
        let datagram = Datagram::decode(br#"{"ip": "8.8.8.8", "platform": "PHP"}"#).unwrap();

        assert_eq!(
            datagram,
            Datagram::Addressed {
                address: "8.8.8.8".parse().unwrap(),
                platform: "php".to_string(),
            }
        );
    }

    #[test]
    fn test_addressed_platform_defaults_to_other() {
        for payload in [&br#"{"ip": "10.0.0.1"}"#[..], br#"{"ip": "10.0.0.1", "platform": ""}"#] {
            let datagram = Datagram::decode(payload).unwrap();
            assert_eq!(datagram.platform(), DEFAULT_PLATFORM);
        }
    }

    #[test]
    fn test_decode_tolerates_trailing_newline() {
        assert!(Datagram::decode(b"[1,2,3,\"go\"]\n").is_ok());
    }

    #[test]
    fn test_malformed_payloads_rejected() {
        let cases: [&[u8]; 8] = [
            b"",
            b"   ",
            b"not json",
            b"[1,2,3]",
            b"[1,2,\"x\",\"go\"]",
            b"{\"ip\": \"not-an-address\"}",
            b"{\"platform\": \"go\"}",
            &[0xff, 0xfe, 0x00, 0x80],
        ];

        for payload in cases {
            assert!(Datagram::decode(payload).is_err(), "accepted {payload:?}");
        }
    }

    proptest! {
        #[test]
        fn decode_never_panics(payload in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = Datagram::decode(&payload);
        }

        #[test]
        fn decode_accepts_any_valid_coordinates(
            lat in -90.0f64..=90.0,
            lon in -180.0f64..=180.0,
            ts in 0i64..4_000_000_000_000,
            platform in "[a-z]{1,12}",
        ) {
            let payload = format!("[{lat},{lon},{ts},\"{platform}\"]");
            let datagram = Datagram::decode(payload.as_bytes()).unwrap();
            prop_assert_eq!(datagram.platform(), platform.as_str());
        }
    }
}
