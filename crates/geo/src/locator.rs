use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use orbital_models::Coordinates;

use crate::range_table::RangeTableGeolocator;

/// Maps a source address to a map position.
///
/// Lookups are local and bounded; `None` means the address is unknown.
pub trait Geolocator: Send + Sync {
    fn lookup(&self, address: IpAddr) -> Option<Coordinates>;
}

/// Used when no dataset is available: every address is unknown.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledGeolocator;

impl Geolocator for DisabledGeolocator {
    fn lookup(&self, _address: IpAddr) -> Option<Coordinates> {
        None
    }
}

/// Load the dataset at `path`, falling back to [`DisabledGeolocator`] when
/// no path is configured or the dataset cannot be read.
pub fn load_geolocator(path: Option<&Path>) -> Arc<dyn Geolocator> {
    let Some(path) = path else {
        tracing::info!("No geolocation dataset configured, address-keyed datagrams will be dropped");
        return Arc::new(DisabledGeolocator);
    };

    match RangeTableGeolocator::open(path) {
        Ok(table) => {
            tracing::info!(path = %path.display(), ranges = table.len(), "Loaded geolocation dataset");
            Arc::new(table)
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Unable to load geolocation dataset, address-keyed datagrams will be dropped"
            );
            Arc::new(DisabledGeolocator)
        }
    }
}
