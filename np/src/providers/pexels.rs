//! Pexels photo search

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{ImageProvider, ImageRef, ProviderError, check_status, http_client};
use crate::config::ApiEndpoint;

const NAME: &str = "pexels";

/// Pexels API client
pub struct PexelsProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl PexelsProvider {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client()?,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_endpoint(endpoint: &ApiEndpoint) -> Result<Self, ProviderError> {
        let key = endpoint
            .api_key()
            .ok_or_else(|| ProviderError::NotConfigured(format!("{} ({})", NAME, endpoint.api_key_env)))?;
        Self::new(key, endpoint.base_url.clone())
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    id: u64,
    src: PhotoSrc,
    photographer: String,
    photographer_url: Option<String>,
    #[serde(default)]
    alt: String,
}

#[derive(Debug, Deserialize)]
struct PhotoSrc {
    large: String,
}

fn first_result(body: &str, query: &str) -> Result<Option<ImageRef>, ProviderError> {
    let response: SearchResponse = serde_json::from_str(body).map_err(|e| ProviderError::Decode {
        provider: NAME.to_string(),
        message: e.to_string(),
    })?;

    Ok(response.photos.into_iter().next().map(|photo| ImageRef {
        provider: NAME.to_string(),
        asset_id: Some(photo.id.to_string()),
        url: photo.src.large,
        description: if photo.alt.trim().is_empty() {
            query.to_string()
        } else {
            photo.alt
        },
        author: photo.photographer,
        author_url: photo.photographer_url,
    }))
}

#[async_trait]
impl ImageProvider for PexelsProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn search(&self, query: &str, page: u32) -> Result<Option<ImageRef>, ProviderError> {
        debug!(%query, page, "PexelsProvider::search: called");
        let url = format!("{}/v1/search", self.base_url);
        let page = page.max(1).to_string();
        let response = self
            .client
            .get(&url)
            .header("Authorization", &self.api_key)
            .query(&[
                ("query", query),
                ("page", page.as_str()),
                ("per_page", "1"),
                ("orientation", "landscape"),
            ])
            .send()
            .await?;
        let body = check_status(NAME, response).await?.text().await?;
        first_result(&body, query)
    }

    async fn fetch(&self, image: &ImageRef) -> Result<Vec<u8>, ProviderError> {
        debug!(url = %image.url, "PexelsProvider::fetch: called");
        let response = self.client.get(&image.url).send().await?;
        let bytes = check_status(NAME, response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}
