//! Image provider trait and the primary/fallback chain

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::{PexelsProvider, ProviderError, UnsplashProvider};
use crate::config::{ImageProviderKind, ImagesConfig};

/// Reference to an image found by a provider search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Provider name, e.g. "unsplash"
    pub provider: String,
    /// Provider's own id for the asset, when it has one
    pub asset_id: Option<String>,
    /// Direct URL of the rendition to download
    pub url: String,
    /// Alt text
    pub description: String,
    /// Photographer credit
    pub author: String,
    /// Page to link the credit to
    pub author_url: Option<String>,
}

impl ImageRef {
    /// Stable identity for the dedup ledger
    ///
    /// `provider:asset_id` when the provider gives an id, otherwise the SHA-256
    /// of the download URL.
    pub fn fingerprint(&self) -> String {
        match &self.asset_id {
            Some(id) if !id.is_empty() => format!("{}:{}", self.provider, id),
            _ => {
                let mut hasher = Sha256::new();
                hasher.update(self.url.as_bytes());
                format!("{:x}", hasher.finalize())
            }
        }
    }

    /// Human-readable credit line
    pub fn credit(&self) -> String {
        format!("Photo by {} on {}", self.author, capitalize(&self.provider))
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A searchable image source
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Name stored in `ImageRef::provider`
    fn name(&self) -> &str;

    /// Best match for `query` on results page `page` (1-based); None when there is no match
    async fn search(&self, query: &str, page: u32) -> Result<Option<ImageRef>, ProviderError>;

    /// Download the image binary
    async fn fetch(&self, image: &ImageRef) -> Result<Vec<u8>, ProviderError>;
}

/// Ordered fallback chain of image providers
///
/// `search` tries each provider in turn; an error or a miss moves on to the
/// next one. `fetch` goes to the provider that produced the reference.
pub struct ImageProviders {
    providers: Vec<Arc<dyn ImageProvider>>,
}

impl ImageProviders {
    pub fn new(providers: Vec<Arc<dyn ImageProvider>>) -> Self {
        debug!(count = providers.len(), "ImageProviders::new: called");
        Self { providers }
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }
}

#[async_trait]
impl ImageProvider for ImageProviders {
    fn name(&self) -> &str {
        "chain"
    }

    async fn search(&self, query: &str, page: u32) -> Result<Option<ImageRef>, ProviderError> {
        debug!(%query, page, "ImageProviders::search: called");
        for provider in &self.providers {
            match provider.search(query, page).await {
                Ok(Some(image)) => {
                    debug!(provider = provider.name(), "ImageProviders::search: hit");
                    return Ok(Some(image));
                }
                Ok(None) => {
                    debug!(provider = provider.name(), "ImageProviders::search: no match, trying next");
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "Image search failed, trying next provider");
                }
            }
        }
        Ok(None)
    }

    async fn fetch(&self, image: &ImageRef) -> Result<Vec<u8>, ProviderError> {
        debug!(provider = %image.provider, url = %image.url, "ImageProviders::fetch: called");
        let provider = self
            .providers
            .iter()
            .find(|p| p.name() == image.provider)
            .ok_or_else(|| ProviderError::UnknownSource(image.provider.clone()))?;
        provider.fetch(image).await
    }
}

/// Build the chain from config: the configured provider first, the other as fallback
///
/// Providers without an API key are left out with a warning.
pub fn build_image_providers(config: &ImagesConfig) -> ImageProviders {
    debug!(primary = %config.provider, "build_image_providers: called");
    let order = match config.provider {
        ImageProviderKind::Unsplash => [ImageProviderKind::Unsplash, ImageProviderKind::Pexels],
        ImageProviderKind::Pexels => [ImageProviderKind::Pexels, ImageProviderKind::Unsplash],
    };

    let mut providers: Vec<Arc<dyn ImageProvider>> = Vec::new();
    for kind in order {
        let built: Result<Arc<dyn ImageProvider>, ProviderError> = match kind {
            ImageProviderKind::Unsplash => {
                UnsplashProvider::from_endpoint(&config.unsplash).map(|p| Arc::new(p) as Arc<dyn ImageProvider>)
            }
            ImageProviderKind::Pexels => {
                PexelsProvider::from_endpoint(&config.pexels).map(|p| Arc::new(p) as Arc<dyn ImageProvider>)
            }
        };
        match built {
            Ok(provider) => providers.push(provider),
            Err(e) => warn!(provider = %kind, error = %e, "Image provider unavailable"),
        }
    }

    info!(providers = ?providers.iter().map(|p| p.name().to_string()).collect::<Vec<_>>(), "Image providers ready");
    ImageProviders::new(providers)
}


#[cfg(test)]
mod tests {
    use super::fake::{FakeImageProvider, image};
    use super::*;

    #[test]
    fn test_fingerprint_prefers_asset_id() {
        let img = image("unsplash", "abc123");
        assert_eq!(img.fingerprint(), "unsplash:abc123");

        let anonymous = ImageRef {
            asset_id: None,
            ..img.clone()
        };
        let fp = anonymous.fingerprint();
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(fp, anonymous.clone().fingerprint());
        assert_eq!(img.credit(), "Photo by Ana on Unsplash");
    }

    #[tokio::test]
    async fn test_chain_falls_back_on_error() {
        let chain = ImageProviders::new(vec![
            Arc::new(FakeImageProvider::failing("unsplash")),
            Arc::new(FakeImageProvider::new("pexels", vec![Some(image("pexels", "p1"))])),
        ]);

        let found = chain.search("Piran harbour", 1).await.unwrap().unwrap();
        assert_eq!(found.provider, "pexels");

        let bytes = chain.fetch(&found).await.unwrap();
        assert!(!bytes.is_empty());
    }

    #[tokio::test]
    async fn test_chain_falls_back_on_miss() {
        let primary = Arc::new(FakeImageProvider::new("unsplash", vec![None]));
        let chain = ImageProviders::new(vec![
            primary.clone(),
            Arc::new(FakeImageProvider::new("pexels", vec![Some(image("pexels", "p1"))])),
        ]);

        assert_eq!(chain.search("x", 1).await.unwrap().unwrap().asset_id.as_deref(), Some("p1"));
        assert_eq!(primary.queries.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_chain_exhausted_is_none() {
        let chain = ImageProviders::new(vec![Arc::new(FakeImageProvider::failing("unsplash"))]);
        assert!(chain.search("x", 1).await.unwrap().is_none());
        assert!(chain.fetch(&image("flickr", "f1")).await.is_err());
    }
}
