//! Publishable document and the text shaping applied to generated prose

use chrono::NaiveDate;
use placestore::PostKind;
use serde::{Deserialize, Serialize};

use crate::providers::ImageRef;

/// Excerpt length in characters
pub const EXCERPT_CHARS: usize = 160;

/// Which template a document was written from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Daily,
    Travel,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Travel => "travel",
        }
    }

    /// Name of the prompt template for this kind
    pub fn template(&self) -> &'static str {
        self.as_str()
    }
}

impl From<ContentKind> for PostKind {
    fn from(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Daily => PostKind::Daily,
            ContentKind::Travel => PostKind::Travel,
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An image attached to a document, with its downloaded binary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentImage {
    #[serde(flatten)]
    pub image: ImageRef,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

/// Assembled post, ready for the publication gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub kind: ContentKind,
    pub date: NaiveDate,
    pub title: String,
    /// Paragraphs separated by blank lines
    pub body: String,
    pub excerpt: String,
    pub tags: Vec<String>,
    pub images: Vec<DocumentImage>,
}

impl Document {
    /// Shape generated text into a document
    ///
    /// `fallback_title` is used when the text has no usable title line.
    pub fn from_generated(
        kind: ContentKind,
        date: NaiveDate,
        text: &str,
        fallback_title: &str,
        tags: Vec<String>,
        images: Vec<DocumentImage>,
    ) -> Self {
        let (title, raw_body) = split_title(text, fallback_title);
        let body = wrap_paragraphs(&raw_body);
        let excerpt = excerpt(&body, EXCERPT_CHARS);
        Self {
            kind,
            date,
            title,
            body,
            excerpt,
            tags: dedupe_tags(tags),
            images,
        }
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.body.split("\n\n").filter(|p| !p.trim().is_empty())
    }
}

/// First non-empty line as title (markdown markers removed), the rest as body
pub fn split_title(text: &str, fallback_title: &str) -> (String, String) {
    let text = text.trim();
    let mut lines = text.lines();
    let first = lines.by_ref().find(|l| !l.trim().is_empty()).unwrap_or_default();
    let rest: Vec<&str> = lines.collect();
    let body = rest.join("\n").trim().to_string();

    let title = clean_title(first);
    if body.is_empty() || title.is_empty() {
        // A single block of prose has no separate title line
        return (fallback_title.to_string(), text.to_string());
    }
    (title, body)
}

fn clean_title(line: &str) -> String {
    let mut title = line.trim().trim_start_matches('#').trim();
    for prefix in ["Title:", "title:", "TITLE:"] {
        if let Some(stripped) = title.strip_prefix(prefix) {
            title = stripped.trim();
        }
    }
    title
        .trim_matches(|c| c == '*' || c == '"' || c == '_')
        .trim()
        .to_string()
}

/// Join wrapped lines within a paragraph and separate paragraphs by one blank line
///
/// Markdown heading lines inside the body become their own paragraph without the
/// `#` markers.
pub fn wrap_paragraphs(body: &str) -> String {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    let flush = |current: &mut Vec<&str>, paragraphs: &mut Vec<String>| {
        if !current.is_empty() {
            paragraphs.push(current.join(" "));
            current.clear();
        }
    };

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            flush(&mut current, &mut paragraphs);
        } else if line.starts_with('#') {
            flush(&mut current, &mut paragraphs);
            paragraphs.push(line.trim_start_matches('#').trim().to_string());
        } else {
            current.push(line);
        }
    }
    flush(&mut current, &mut paragraphs);

    paragraphs
        .into_iter()
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// At most `max_chars` characters of the body, cut at a word boundary
pub fn excerpt(body: &str, max_chars: usize) -> String {
    let flat = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }

    let cut: String = flat.chars().take(max_chars).collect();
    let trimmed = match cut.rfind(' ') {
        Some(idx) if idx > 0 => &cut[..idx],
        _ => cut.as_str(),
    };
    let trimmed = trimmed.trim_end_matches(|c: char| c.is_ascii_punctuation());
    format!("{}…", trimmed)
}

/// Drop empty and case-insensitively repeated tags, keeping first occurrence order
pub fn dedupe_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_string();
        let key = tag.to_lowercase();
        if tag.is_empty() || seen.contains(&key) {
            continue;
        }
        seen.push(key);
        out.push(tag);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    #[test]
    fn test_split_title() {
        let text = "# **Salt, Stone and Sea in Piran**\n\nThe morning started\nwith gulls.\n\nLater, coffee.";
        let (title, body) = split_title(text, "Day 3 in Piran");
        assert_eq!(title, "Salt, Stone and Sea in Piran");
        assert!(body.starts_with("The morning started"));

        let (title, _) = split_title("Title: \"Slow Days\"\nbody", "x");
        assert_eq!(title, "Slow Days");
    }

    #[test]
    fn test_split_title_without_body_uses_fallback() {
        let (title, body) = split_title("Just one line of prose.", "Day 2 in Ston");
        assert_eq!(title, "Day 2 in Ston");
        assert_eq!(body, "Just one line of prose.");
    }

    #[test]
    fn test_wrap_paragraphs() {
        let body = "First line\n  continues here.\n\n\n## A heading\nSecond   para.";
        assert_eq!(
            wrap_paragraphs(body),
            "First line continues here.\n\nA heading\n\nSecond para."
        );
    }

    #[test]
    fn test_excerpt_cuts_at_word_boundary() {
        let body = "word ".repeat(60);
        let ex = excerpt(&body, 23);
        assert_eq!(ex, "word word word word…");
        assert_eq!(excerpt("short one", 160), "short one");
    }

    #[test]
    fn test_document_from_generated() {
        let doc = Document::from_generated(
            ContentKind::Daily,
            day(),
            "Market Morning\n\nTomatoes everywhere.\n\nThen a nap.",
            "Day 3",
            vec!["Piran".into(), "Slovenia".into(), "piran".into(), " ".into(), "daily".into()],
            vec![],
        );
        assert_eq!(doc.title, "Market Morning");
        assert_eq!(doc.paragraphs().count(), 2);
        assert_eq!(doc.excerpt, "Tomatoes everywhere. Then a nap.");
        assert_eq!(doc.tags, vec!["Piran", "Slovenia", "daily"]);
        assert_eq!(PostKind::from(doc.kind), PostKind::Daily);
    }
}
