use crate::constants::{GEOCODE_HTTP_TIMEOUT_SECONDS, MAPBOX_GEOCODING_BASE_URL};
use crate::error::GeocodeError;
use crate::models::Location;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Free-text place lookup.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, query: &str) -> Result<Location, GeocodeError>;
}

/// Mapbox forward-geocoding client
#[derive(Clone)]
pub struct MapboxGeocoder {
    client: Client,
    api_key: String,
    base_url: String,
}

impl MapboxGeocoder {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, MAPBOX_GEOCODING_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        MapboxGeocoder {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    text: String,
    place_name: String,
    /// [lng, lat]
    center: [f64; 2],
}

#[async_trait]
impl Geocoder for MapboxGeocoder {
    async fn geocode(&self, query: &str) -> Result<Location, GeocodeError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(GeocodeError::NoMatch(query.to_string()));
        }

        let url = format!("{}/{}.json", self.base_url, urlencoding::encode(query));

        let response = self
            .client
            .get(&url)
            .query(&[("access_token", self.api_key.as_str()), ("limit", "1")])
            .timeout(Duration::from_secs(GEOCODE_HTTP_TIMEOUT_SECONDS))
            .send()
            .await
            .map_err(|e| GeocodeError::Upstream(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(status = %status, "Mapbox geocoding HTTP error {}: {}", status, error_text);
            return Err(GeocodeError::Upstream(format!("HTTP {}: {}", status, error_text)));
        }

        let body: GeocodingResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::Upstream(format!("Failed to parse response: {}", e)))?;

        let location = first_location(body).ok_or_else(|| GeocodeError::NoMatch(query.to_string()))?;
        tracing::debug!(
            query,
            lat = location.latitude,
            lng = location.longitude,
            "Geocoded '{}' to '{}'",
            query,
            location.address
        );
        Ok(location)
    }
}

fn first_location(body: GeocodingResponse) -> Option<Location> {
    let feature = body.features.into_iter().next()?;
    let [lng, lat] = feature.center;
    Location::new(feature.text, feature.place_name, lat, lng).ok()
}
