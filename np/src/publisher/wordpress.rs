//! WordPress REST API publisher

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::{PublishError, Published, Publisher, image_format, slugify};
use crate::config::{PostStatus, WordPressConfig};
use crate::content::{Document, DocumentImage};
use crate::llm::USER_AGENT;
use crate::providers::HTTP_TIMEOUT;

/// Publishes to `/wp-json/wp/v2` with an application password
pub struct WordPressPublisher {
    client: Client,
    api_base: String,
    username: String,
    password: String,
    status: PostStatus,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: u64,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    source_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Term {
    id: u64,
    name: String,
}

struct UploadedImage {
    id: u64,
    url: String,
}

impl WordPressPublisher {
    pub fn new(
        base_url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        status: PostStatus,
    ) -> Result<Self, PublishError> {
        let client = Client::builder().timeout(HTTP_TIMEOUT).user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            api_base: format!("{}/wp-json/wp/v2", base_url.trim_end_matches('/')),
            username: username.into(),
            password: password.into(),
            status,
        })
    }

    /// Build from config, reading the application password from its env var
    pub fn from_config(config: &WordPressConfig) -> Result<Self, PublishError> {
        if config.base_url.trim().is_empty() {
            return Err(PublishError::NotConfigured("publisher.wordpress.base-url is empty".to_string()));
        }
        if config.username.trim().is_empty() {
            return Err(PublishError::NotConfigured("publisher.wordpress.username is empty".to_string()));
        }
        let password = std::env::var(&config.password_env)
            .map_err(|_| PublishError::NotConfigured(format!("{} is not set", config.password_env)))?;
        Self::new(&config.base_url, config.username.clone(), password, config.status)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.basic_auth(&self.username, Some(&self.password))
    }

    async fn check(response: Response) -> Result<Response, PublishError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(PublishError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn upload_image(&self, image: &DocumentImage, title: &str, n: usize) -> Result<UploadedImage, PublishError> {
        let (ext, mime) = image_format(&image.image.url);
        let filename = format!("{}-{}.{}", slugify(title), n + 1, ext);
        debug!(%filename, bytes = image.bytes.len(), "upload_image: called");

        let response = self
            .authed(self.client.post(format!("{}/media", self.api_base)))
            .header("Content-Type", mime)
            .header("Content-Disposition", format!("attachment; filename=\"{}\"", filename))
            .body(image.bytes.clone())
            .send()
            .await?;
        let created: Created = Self::check(response).await?.json().await?;

        // Alt text and credit are set in a second call; failure keeps the upload
        let meta = self
            .authed(self.client.post(format!("{}/media/{}", self.api_base, created.id)))
            .json(&json!({
                "alt_text": image.image.description,
                "caption": image.image.credit(),
            }))
            .send()
            .await;
        if let Err(e) = meta {
            warn!(media_id = created.id, error = %e, "Failed to set media metadata");
        }

        Ok(UploadedImage {
            id: created.id,
            url: created.source_url.unwrap_or_else(|| image.image.url.clone()),
        })
    }

    /// Id of the tag with this name, creating it when missing
    async fn resolve_tag(&self, name: &str) -> Result<u64, PublishError> {
        debug!(%name, "resolve_tag: called");
        let response = self
            .authed(self.client.get(format!("{}/tags", self.api_base)))
            .query(&[("search", name), ("per_page", "20")])
            .send()
            .await?;
        let terms: Vec<Term> = Self::check(response).await?.json().await?;
        if let Some(term) = terms.iter().find(|t| t.name.eq_ignore_ascii_case(name)) {
            return Ok(term.id);
        }

        let response = self
            .authed(self.client.post(format!("{}/tags", self.api_base)))
            .json(&json!({ "name": name }))
            .send()
            .await?;
        let status = response.status();
        let body: Value = response.json().await?;
        if status.is_success() {
            return body["id"].as_u64().ok_or_else(|| PublishError::Status {
                status: status.as_u16(),
                message: "tag response without id".to_string(),
            });
        }
        // Created concurrently or differing only by accents: WordPress reports the existing id
        if body["code"] == "term_exists"
            && let Some(id) = body["data"]["term_id"].as_u64()
        {
            return Ok(id);
        }
        Err(PublishError::Status {
            status: status.as_u16(),
            message: body.to_string(),
        })
    }

    async fn resolve_tags(&self, tags: &[String]) -> Vec<u64> {
        let mut ids = Vec::with_capacity(tags.len());
        for tag in tags {
            match self.resolve_tag(tag).await {
                Ok(id) => ids.push(id),
                Err(e) => warn!(%tag, error = %e, "Skipping tag"),
            }
        }
        ids
    }
}

/// Paragraphs as `<p>` blocks, followed by figures for the non-featured images
fn render_html(document: &Document, uploaded: &[(UploadedImage, &DocumentImage)]) -> String {
    let mut html: Vec<String> = document
        .paragraphs()
        .map(|p| format!("<p>{}</p>", escape_html(p)))
        .collect();
    for (upload, image) in uploaded.iter().skip(1) {
        html.push(format!(
            "<figure><img src=\"{}\" alt=\"{}\"/><figcaption>{}</figcaption></figure>",
            escape_html(&upload.url),
            escape_html(&image.image.description),
            escape_html(&image.image.credit())
        ));
    }
    html.join("\n")
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[async_trait]
impl Publisher for WordPressPublisher {
    fn name(&self) -> &str {
        "wordpress"
    }

    async fn publish(&self, document: &Document) -> Result<Published, PublishError> {
        debug!(title = %document.title, images = document.images.len(), "WordPressPublisher::publish: called");

        let mut uploaded = Vec::with_capacity(document.images.len());
        for (n, image) in document.images.iter().enumerate() {
            match self.upload_image(image, &document.title, n).await {
                Ok(upload) => uploaded.push((upload, image)),
                Err(e) => warn!(url = %image.image.url, error = %e, "Image upload failed, publishing without it"),
            }
        }
        let tag_ids = self.resolve_tags(&document.tags).await;

        let mut post = json!({
            "title": document.title,
            "content": render_html(document, &uploaded),
            "excerpt": document.excerpt,
            "status": self.status.as_str(),
            "tags": tag_ids,
        });
        if let Some((featured, _)) = uploaded.first() {
            post["featured_media"] = json!(featured.id);
        }

        let response = self
            .authed(self.client.post(format!("{}/posts", self.api_base)))
            .json(&post)
            .send()
            .await?;
        let created: Created = Self::check(response).await?.json().await?;

        let published = Published {
            id: created.id.to_string(),
            url: created.link.unwrap_or_default(),
        };
        info!(id = %published.id, url = %published.url, status = self.status.as_str(), "Post published to WordPress");
        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentKind;
    use crate::providers::images::fake::image;
    use chrono::NaiveDate;

    #[test]
    fn test_render_html() {
        let images = vec![
            DocumentImage {
                image: image("unsplash", "a"),
                bytes: vec![],
            },
            DocumentImage {
                image: image("pexels", "b"),
                bytes: vec![],
            },
        ];
        let doc = Document::from_generated(
            ContentKind::Daily,
            NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            "Title\n\nFish & chips <fresh>.\n\nSecond.",
            "x",
            vec![],
            images.clone(),
        );
        let uploaded = vec![
            (UploadedImage { id: 1, url: "https://blog/a.jpg".to_string() }, &images[0]),
            (UploadedImage { id: 2, url: "https://blog/b.jpg".to_string() }, &images[1]),
        ];

        let html = render_html(&doc, &uploaded);
        assert!(html.starts_with("<p>Fish &amp; chips &lt;fresh&gt;.</p>\n<p>Second.</p>"));
        assert!(html.contains("src=\"https://blog/b.jpg\""));
        assert!(!html.contains("https://blog/a.jpg"));
        assert!(html.contains("Photo by Ana on Pexels"));
    }

    #[test]
    fn test_api_base() {
        let publisher = WordPressPublisher::new("https://blog.example.com/", "nomad", "pw", PostStatus::Draft).unwrap();
        assert_eq!(publisher.api_base, "https://blog.example.com/wp-json/wp/v2");
    }
}
