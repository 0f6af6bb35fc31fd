use async_trait::async_trait;

/// A resolved point on the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("no location found for the address")]
    NotFound,
    #[error("geocoder unavailable: {0}")]
    Unavailable(String),
}

/// Resolves free-form street addresses to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn locate(&self, address: &str) -> Result<Coordinates, GeocodeError>;
}

/// Geocoder used when no lookup backend is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeocoder;

#[async_trait]
impl Geocoder for NoGeocoder {
    async fn locate(&self, _address: &str) -> Result<Coordinates, GeocodeError> {
        Err(GeocodeError::Unavailable(
            "no geocoding backend configured".to_string(),
        ))
    }
}
