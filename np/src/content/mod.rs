//! Content assembly
//!
//! Combines the day's selection (or a completed move) with generated prose and
//! deduplicated images into a `Document` for the publication gateway.

mod assembler;
mod document;

pub use assembler::{ContentAssembler, ContentError, DailyContext, TravelContext};
pub use document::{ContentKind, Document, DocumentImage, EXCERPT_CHARS, dedupe_tags, excerpt, split_title, wrap_paragraphs};
