//! Place name to coordinates lookup

use async_trait::async_trait;
use placestore::Coordinates;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ProviderError, check_status, http_client};
use crate::config::GeocoderConfig;

const NAME: &str = "nominatim";

/// Resolves a town name to coordinates
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// None on no match or on failure
    async fn locate(&self, name: &str, country: &str) -> Option<Coordinates>;
}

/// OpenStreetMap Nominatim search
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &GeocoderConfig) -> Result<Option<Self>, ProviderError> {
        if !config.enabled {
            return Ok(None);
        }
        Self::new(config.base_url.clone()).map(Some)
    }

    async fn search(&self, name: &str, country: &str) -> Result<Option<Coordinates>, ProviderError> {
        let url = format!("{}/search", self.base_url);
        let query = format!("{}, {}", name, country);
        let response = self
            .client
            .get(&url)
            .query(&[("q", query.as_str()), ("format", "json"), ("limit", "1")])
            .send()
            .await?;
        let body = check_status(NAME, response).await?.text().await?;
        parse_first(&body)
    }
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

fn parse_first(body: &str) -> Result<Option<Coordinates>, ProviderError> {
    let decode = |message: String| ProviderError::Decode {
        provider: NAME.to_string(),
        message,
    };
    let hits: Vec<SearchHit> = serde_json::from_str(body).map_err(|e| decode(e.to_string()))?;
    let Some(hit) = hits.into_iter().next() else {
        return Ok(None);
    };
    let lat: f64 = hit.lat.parse().map_err(|_| decode(format!("bad latitude '{}'", hit.lat)))?;
    let lng: f64 = hit.lon.parse().map_err(|_| decode(format!("bad longitude '{}'", hit.lon)))?;
    Ok(Some(Coordinates::new(lat, lng)))
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn locate(&self, name: &str, country: &str) -> Option<Coordinates> {
        debug!(%name, %country, "NominatimGeocoder::locate: called");
        match self.search(name, country).await {
            Ok(found) => found,
            Err(e) => {
                warn!(%name, %country, error = %e, "Geocoding failed");
                None
            }
        }
    }
}
