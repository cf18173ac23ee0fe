use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrbitalError {
    #[error("Malformed datagram: {0}")]
    Decode(String),

    #[error("Invalid coordinates: lat={latitude}, lon={longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Geolocation dataset error: {reason}")]
    GeoDataset { reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OrbitalError>;
