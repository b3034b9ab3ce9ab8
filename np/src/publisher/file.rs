//! Publisher that writes posts to a local directory

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use super::{PublishError, Published, Publisher, image_format, slugify};
use crate::content::{Document, DocumentImage};

/// Name of the JSON file inside each post directory
pub const POST_FILE: &str = "post.json";

/// Writes each document into `<output_dir>/<date>-<slug>-<suffix>/`
pub struct FilePublisher {
    output_dir: PathBuf,
}

#[derive(Serialize)]
struct PostFile<'a> {
    id: &'a str,
    published_at: String,
    #[serde(flatten)]
    document: &'a Document,
    image_files: Vec<String>,
}

impl FilePublisher {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    async fn write_images(&self, dir: &Path, images: &[DocumentImage]) -> Result<Vec<String>, PublishError> {
        let mut names = Vec::with_capacity(images.len());
        for (n, image) in images.iter().enumerate() {
            let (ext, _) = image_format(&image.image.url);
            let name = format!("image-{}.{}", n + 1, ext);
            fs::write(dir.join(&name), &image.bytes).await?;
            names.push(name);
        }
        Ok(names)
    }
}

#[async_trait]
impl Publisher for FilePublisher {
    fn name(&self) -> &str {
        "file"
    }

    async fn publish(&self, document: &Document) -> Result<Published, PublishError> {
        debug!(title = %document.title, output_dir = %self.output_dir.display(), "FilePublisher::publish: called");
        let id = Uuid::now_v7().to_string();
        let suffix: String = id.chars().rev().take(8).collect();
        let dir = self.output_dir.join(format!(
            "{}-{}-{}",
            document.date.format("%Y-%m-%d"),
            slugify(&document.title),
            suffix
        ));
        fs::create_dir_all(&dir).await?;

        let image_files = self.write_images(&dir, &document.images).await?;
        let post = PostFile {
            id: &id,
            published_at: Utc::now().to_rfc3339(),
            document,
            image_files,
        };
        fs::write(dir.join(POST_FILE), serde_json::to_string_pretty(&post)?).await?;

        let url = format!("file://{}", dir.display());
        info!(%id, %url, "Post written");
        Ok(Published { id, url })
    }
}
