//! Prompt Template System
//!
//! Loads and renders `.pmt` (prompt template) files for every generation call.
//!
//! Template loading chain:
//! 1. `<placestore-dir>/prompts/{name}.pmt` (user override)
//! 2. Embedded fallback in code
//!
//! Templates use Handlebars syntax for variable substitution.

pub mod embedded;
mod loader;

pub use loader::PromptLoader;
