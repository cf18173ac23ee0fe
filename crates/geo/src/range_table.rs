use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use orbital_models::{Coordinates, OrbitalError, Result};
use serde::Deserialize;

use crate::locator::Geolocator;

/// One dataset record: an inclusive IPv4 range and its position.
#[derive(Debug, Clone, Deserialize)]
pub struct GeoRange {
    pub start: Ipv4Addr,
    pub end: Ipv4Addr,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    start: u32,
    end: u32,
    coordinates: Coordinates,
}

/// In-memory IPv4 range table searched by binary search.
#[derive(Debug, Clone, Default)]
pub struct RangeTableGeolocator {
    entries: Vec<Entry>,
}

impl RangeTableGeolocator {
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| OrbitalError::GeoDataset {
            reason: format!("{}: {e}", path.display()),
        })?;
        Self::from_json(&bytes)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let ranges: Vec<GeoRange> = serde_json::from_slice(bytes)?;
        Self::from_ranges(ranges)
    }

    pub fn from_ranges(ranges: Vec<GeoRange>) -> Result<Self> {
        let mut entries = ranges
            .into_iter()
            .map(|range| {
                let (start, end) = (u32::from(range.start), u32::from(range.end));
                if start > end {
                    return Err(OrbitalError::GeoDataset {
                        reason: format!("range {} - {} is reversed", range.start, range.end),
                    });
                }
                Ok(Entry {
                    start,
                    end,
                    coordinates: Coordinates::new(range.latitude, range.longitude)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        entries.sort_by_key(|entry| entry.start);
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup_v4(&self, address: Ipv4Addr) -> Option<Coordinates> {
        let key = u32::from(address);
        // Last range starting at or before the address.
        let index = self.entries.partition_point(|entry| entry.start <= key);
        let entry = self.entries.get(index.checked_sub(1)?)?;
        (key <= entry.end).then_some(entry.coordinates)
    }
}

impl Geolocator for RangeTableGeolocator {
    fn lookup(&self, address: IpAddr) -> Option<Coordinates> {
        match address {
            IpAddr::V4(v4) => self.lookup_v4(v4),
            IpAddr::V6(v6) => v6.to_ipv4_mapped().and_then(|v4| self.lookup_v4(v4)),
        }
    }
}
