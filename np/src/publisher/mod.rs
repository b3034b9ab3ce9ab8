//! Publication gateway
//!
//! A `Publisher` takes an assembled document and returns where it ended up.
//! WordPress is the production target; the file publisher writes posts to disk
//! for local runs.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::{PublisherConfig, PublisherKind};
use crate::content::Document;

mod file;
mod wordpress;

pub use file::FilePublisher;
pub use wordpress::WordPressPublisher;

/// Errors from publishing
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Publisher returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Publisher not configured: {0}")]
    NotConfigured(String),
}

/// Reference to a published post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Published {
    pub id: String,
    pub url: String,
}

/// Destination for assembled documents
#[async_trait]
pub trait Publisher: Send + Sync {
    fn name(&self) -> &str;

    async fn publish(&self, document: &Document) -> Result<Published, PublishError>;
}

/// Build the configured publisher
pub fn create_publisher(config: &PublisherConfig) -> Result<Arc<dyn Publisher>, PublishError> {
    debug!(kind = ?config.kind, "create_publisher: called");
    match config.kind {
        PublisherKind::File => Ok(Arc::new(FilePublisher::new(&config.output_dir))),
        PublisherKind::WordPress => Ok(Arc::new(WordPressPublisher::from_config(&config.wordpress)?)),
    }
}

/// Lowercase ASCII slug, words joined by dashes
pub(crate) fn slugify(text: &str) -> String {
    let mut slug = String::new();
    let mut dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            dash = false;
        } else if !dash && !slug.is_empty() {
            slug.push('-');
            dash = true;
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "post".to_string()
    } else {
        slug.chars().take(60).collect::<String>().trim_end_matches('-').to_string()
    }
}

/// File extension and MIME type guessed from an image URL
pub(crate) fn image_format(url: &str) -> (&'static str, &'static str) {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();
    if path.ends_with(".png") {
        ("png", "image/png")
    } else if path.ends_with(".webp") {
        ("webp", "image/webp")
    } else {
        ("jpg", "image/jpeg")
    }
}
