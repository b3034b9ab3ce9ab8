//! Unsplash photo search

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{ImageProvider, ImageRef, ProviderError, check_status, http_client};
use crate::config::ApiEndpoint;

const NAME: &str = "unsplash";

/// Unsplash API client
pub struct UnsplashProvider {
    client: Client,
    access_key: String,
    base_url: String,
}

impl UnsplashProvider {
    pub fn new(access_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client()?,
            access_key: access_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build from config; fails when the access key variable is unset
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
    results: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    id: String,
    urls: PhotoUrls,
    alt_description: Option<String>,
    description: Option<String>,
    user: PhotoUser,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: String,
}

#[derive(Debug, Deserialize)]
struct PhotoUser {
    name: String,
    links: Option<UserLinks>,
}

#[derive(Debug, Deserialize)]
struct UserLinks {
    html: Option<String>,
}

/// First photo of a search response
fn first_result(body: &str, query: &str) -> Result<Option<ImageRef>, ProviderError> {
    let response: SearchResponse = serde_json::from_str(body).map_err(|e| ProviderError::Decode {
        provider: NAME.to_string(),
        message: e.to_string(),
    })?;

    Ok(response.results.into_iter().next().map(|photo| ImageRef {
        provider: NAME.to_string(),
        asset_id: Some(photo.id),
        url: photo.urls.regular,
        description: photo
            .alt_description
            .or(photo.description)
            .unwrap_or_else(|| query.to_string()),
        author: photo.user.name,
        author_url: photo.user.links.and_then(|l| l.html),
    }))
}

#[async_trait]
impl ImageProvider for UnsplashProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn search(&self, query: &str, page: u32) -> Result<Option<ImageRef>, ProviderError> {
        debug!(%query, page, "UnsplashProvider::search: called");
        let url = format!("{}/search/photos", self.base_url);
        let page = page.max(1).to_string();
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Client-ID {}", self.access_key))
            .header("Accept-Version", "v1")
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
        debug!(url = %image.url, "UnsplashProvider::fetch: called");
        let response = self.client.get(&image.url).send().await?;
        let bytes = check_status(NAME, response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_result() {
        let body = r#"{
            "total": 2,
            "results": [
                {
                    "id": "Xy12",
                    "urls": {"raw": "https://images.unsplash.com/raw", "regular": "https://images.unsplash.com/regular"},
                    "alt_description": "boats in a harbour",
                    "description": null,
                    "user": {"name": "Marta K", "links": {"html": "https://unsplash.com/@marta"}}
                },
                {
                    "id": "Zz99",
                    "urls": {"regular": "https://images.unsplash.com/other"},
                    "user": {"name": "Other"}
                }
            ]
        }"#;

        let image = first_result(body, "Piran harbour").unwrap().unwrap();
        assert_eq!(image.provider, "unsplash");
        assert_eq!(image.asset_id.as_deref(), Some("Xy12"));
        assert_eq!(image.url, "https://images.unsplash.com/regular");
        assert_eq!(image.description, "boats in a harbour");
        assert_eq!(image.author_url.as_deref(), Some("https://unsplash.com/@marta"));
        assert_eq!(image.fingerprint(), "unsplash:Xy12");
    }

    #[test]
    fn test_empty_and_bad_responses() {
        assert!(first_result(r#"{"total": 0, "results": []}"#, "q").unwrap().is_none());
        assert!(matches!(
            first_result("<html>", "q"),
            Err(ProviderError::Decode { .. })
        ));
    }

    #[test]
    fn test_from_endpoint_requires_key() {
        let endpoint = ApiEndpoint {
            api_key_env: "NOMADPOST_TEST_UNSET_UNSPLASH_KEY".to_string(),
            base_url: "https://api.unsplash.com".to_string(),
        };
        assert!(matches!(
            UnsplashProvider::from_endpoint(&endpoint),
            Err(ProviderError::NotConfigured(_))
        ));
    }
}
