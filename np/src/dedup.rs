//! Content-asset dedup ledger
//!
//! Wraps an image source so that an asset already used in an earlier post is
//! only accepted again when every variation has been tried. Uniqueness is
//! best-effort: running out of attempts accepts a duplicate instead of
//! blocking the post.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::providers::{ImageProvider, ImageRef};
use crate::state::StateManager;

/// Qualifiers appended to the query on attempts 1..=3
pub const VARIATIONS: [&str; 3] = ["at golden hour", "in winter", "street view"];

/// Base query plus one attempt per variation
pub const MAX_ATTEMPTS: u32 = 1 + VARIATIONS.len() as u32;

/// Ledger kind recorded for images
pub const IMAGE_KIND: &str = "image";

/// Query and results page for an attempt
pub fn variation(query: &str, attempt: u32) -> (String, u32) {
    match attempt {
        0 => (query.to_string(), 1),
        n => {
            let qualifier = VARIATIONS[(n as usize - 1) % VARIATIONS.len()];
            (format!("{} {}", query, qualifier), n + 1)
        }
    }
}

/// Image source that consults the used-content ledger before accepting a result
pub struct ImageSourcer {
    provider: Arc<dyn ImageProvider>,
    state: StateManager,
}

impl ImageSourcer {
    pub fn new(provider: Arc<dyn ImageProvider>, state: StateManager) -> Self {
        Self { provider, state }
    }

    /// The underlying provider, for fetching binaries
    pub fn provider(&self) -> &Arc<dyn ImageProvider> {
        &self.provider
    }

    /// Find an image for `query`, preferring one never used before
    ///
    /// The accepted image's fingerprint is recorded. None only when no attempt
    /// returned anything at all.
    pub async fn find(&self, query: &str) -> Option<ImageRef> {
        debug!(%query, "ImageSourcer::find: called");
        let mut last_seen: Option<ImageRef> = None;

        for attempt in 0..MAX_ATTEMPTS {
            let (varied, page) = variation(query, attempt);
            let found = match self.provider.search(&varied, page).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(query = %varied, page, error = %e, "Image search failed");
                    None
                }
            };
            let Some(image) = found else {
                debug!(attempt, query = %varied, page, "ImageSourcer::find: no result");
                continue;
            };

            let fingerprint = image.fingerprint();
            if !self.is_used(&fingerprint).await {
                self.accept(&image, &fingerprint).await;
                debug!(attempt, %fingerprint, "ImageSourcer::find: accepted fresh image");
                return Some(image);
            }
            debug!(attempt, %fingerprint, "ImageSourcer::find: duplicate, trying a variation");
            last_seen = Some(image);
        }

        if let Some(image) = last_seen {
            let fingerprint = image.fingerprint();
            info!(%query, %fingerprint, "No fresh image found, accepting a duplicate");
            self.accept(&image, &fingerprint).await;
            return Some(image);
        }

        warn!(%query, "No image found for query");
        None
    }

    async fn is_used(&self, fingerprint: &str) -> bool {
        match self.state.has_fingerprint(fingerprint).await {
            Ok(used) => used,
            Err(e) => {
                warn!(%fingerprint, error = %e, "Ledger lookup failed, treating image as fresh");
                false
            }
        }
    }

    async fn accept(&self, image: &ImageRef, fingerprint: &str) {
        if let Err(e) = self
            .state
            .record_fingerprint(fingerprint, &image.provider, IMAGE_KIND)
            .await
        {
            warn!(%fingerprint, error = %e, "Failed to record image fingerprint");
        }
    }
}
