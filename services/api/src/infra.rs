use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use rent_management::accounts::{MailError, Mailer, OutboundEmail};
use rent_management::listings::{Coordinates, GeocodeError, Geocoder, NoGeocoder};
use serde::Deserialize;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const GEOCODE_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Mail transport that writes outgoing mail to the log instead of a relay.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, message: OutboundEmail) -> Result<(), MailError> {
        info!(
            to = %message.to,
            from = %message.from,
            subject = %message.subject,
            body = %message.html,
            "outbound email"
        );
        Ok(())
    }
}

/// Google Maps geocoding over HTTPS.
pub(crate) struct GoogleGeocoder {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl GoogleGeocoder {
    pub(crate) fn new(api_key: String) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            api_key,
            endpoint: GEOCODE_ENDPOINT.to_string(),
        })
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn locate(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|err| GeocodeError::Unavailable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Unavailable(format!(
                "geocoding endpoint answered {status}"
            )));
        }

        let payload: GeocodeResponse = response
            .json()
            .await
            .map_err(|err| GeocodeError::Unavailable(err.to_string()))?;
        payload.into_coordinates()
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl GeocodeResponse {
    fn into_coordinates(self) -> Result<Coordinates, GeocodeError> {
        match self.status.as_str() {
            "OK" => self
                .results
                .into_iter()
                .next()
                .and_then(|result| result.geometry)
                .map(|geometry| Coordinates {
                    latitude: geometry.location.lat,
                    longitude: geometry.location.lng,
                })
                .ok_or(GeocodeError::NotFound),
            "ZERO_RESULTS" | "INVALID_REQUEST" => Err(GeocodeError::NotFound),
            other => Err(GeocodeError::Unavailable(format!(
                "geocoding status {other}"
            ))),
        }
    }
}

/// The geocoder the server runs with: Google when a key is configured.
pub(crate) enum ConfiguredGeocoder {
    Google(GoogleGeocoder),
    Disabled(NoGeocoder),
}

impl ConfiguredGeocoder {
    pub(crate) fn from_api_key(api_key: Option<&str>) -> Self {
        let Some(api_key) = api_key.filter(|key| !key.trim().is_empty()) else {
            warn!("GOOGLE_API_KEY not set, address lookups are disabled");
            return Self::Disabled(NoGeocoder);
        };
        match GoogleGeocoder::new(api_key.to_string()) {
            Ok(geocoder) => Self::Google(geocoder),
            Err(err) => {
                warn!(error = %err, "failed to build geocoding client, address lookups are disabled");
                Self::Disabled(NoGeocoder)
            }
        }
    }
}

#[async_trait]
impl Geocoder for ConfiguredGeocoder {
    async fn locate(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        match self {
            Self::Google(geocoder) => geocoder.locate(address).await,
            Self::Disabled(geocoder) => geocoder.locate(address).await,
        }
    }
}
