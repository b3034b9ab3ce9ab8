//! External data providers
//!
//! Image search (Unsplash, Pexels), current weather (OpenWeatherMap) and
//! geocoding (Nominatim). Each sits behind a trait so the cycle can be
//! exercised with in-memory fakes.

use std::time::Duration;

use reqwest::Client;

mod error;
mod geocode;
pub(crate) mod images;
mod pexels;
mod unsplash;
mod weather;

pub use error::ProviderError;
pub use geocode::{Geocoder, NominatimGeocoder};
pub use images::{ImageProvider, ImageProviders, ImageRef, build_image_providers};
pub use pexels::PexelsProvider;
pub use unsplash::UnsplashProvider;
pub use weather::{OpenWeatherProvider, WeatherProvider, WeatherReport};

use crate::llm::USER_AGENT;

/// Timeout applied to every provider request
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client shared by the provider implementations
pub(crate) fn http_client() -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .map_err(ProviderError::Http)
}

/// Turn a non-success response into a `ProviderError::Status`
pub(crate) async fn check_status(provider: &str, response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        provider: provider.to_string(),
        status: status.as_u16(),
        message,
    })
}
