//! Current weather lookup

use async_trait::async_trait;
use placestore::Coordinates;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ProviderError, check_status, http_client};
use crate::config::WeatherConfig;

const NAME: &str = "openweathermap";

/// Current conditions at a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub description: String,
    pub temperature: f64,
    pub humidity: u32,
    /// "°C" or "°F"
    pub unit: String,
}

impl WeatherReport {
    /// One-line summary used in prompts
    pub fn summary(&self) -> String {
        format!(
            "{}, {:.0}{}, humidity {}%",
            self.description, self.temperature, self.unit, self.humidity
        )
    }
}

/// Source of current conditions
///
/// Failures and unknown places both come back as `None`.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, at: Coordinates) -> Option<WeatherReport>;
}

/// OpenWeatherMap current weather API
pub struct OpenWeatherProvider {
    client: Client,
    api_key: String,
    base_url: String,
    units: String,
}

impl OpenWeatherProvider {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, units: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client()?,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            units: units.into(),
        })
    }

    /// None when weather is disabled; an error when enabled without a key
    pub fn from_config(config: &WeatherConfig) -> Result<Option<Self>, ProviderError> {
        if !config.enabled {
            debug!("OpenWeatherProvider::from_config: disabled");
            return Ok(None);
        }
        let endpoint = config.endpoint();
        let key = endpoint
            .api_key()
            .ok_or_else(|| ProviderError::NotConfigured(format!("{} ({})", NAME, endpoint.api_key_env)))?;
        Self::new(key, endpoint.base_url, config.units.clone()).map(Some)
    }

    async fn fetch(&self, at: Coordinates) -> Result<Option<WeatherReport>, ProviderError> {
        let url = format!("{}/data/2.5/weather", self.base_url);
        let lat = at.lat.to_string();
        let lon = at.lng.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", self.units.as_str()),
            ])
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = check_status(NAME, response).await?.text().await?;
        parse_report(&body, &self.units)
    }
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    #[serde(default)]
    weather: Vec<Condition>,
    main: MainBlock,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    #[serde(default)]
    humidity: u32,
}

fn unit_symbol(units: &str) -> &'static str {
    match units {
        "imperial" => "°F",
        "standard" => "K",
        _ => "°C",
    }
}

fn parse_report(body: &str, units: &str) -> Result<Option<WeatherReport>, ProviderError> {
    let response: CurrentResponse = serde_json::from_str(body).map_err(|e| ProviderError::Decode {
        provider: NAME.to_string(),
        message: e.to_string(),
    })?;
    let Some(condition) = response.weather.into_iter().next() else {
        return Ok(None);
    };
    Ok(Some(WeatherReport {
        description: condition.description,
        temperature: response.main.temp,
        humidity: response.main.humidity,
        unit: unit_symbol(units).to_string(),
    }))
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current(&self, at: Coordinates) -> Option<WeatherReport> {
        debug!(lat = at.lat, lng = at.lng, "OpenWeatherProvider::current: called");
        match self.fetch(at).await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Weather lookup failed, continuing without weather");
                None
            }
        }
    }
}
