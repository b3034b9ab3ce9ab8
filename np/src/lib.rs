//! NomadPost - Autonomous Travel-Persona Blog
//!
//! A persona travels slowly through small European towns. Once per scheduled
//! cycle NomadPost decides whether the persona stays or moves on, picks the
//! day's places, writes the post with a language model, sources images and
//! publishes the result.
//!
//! # Core Concepts
//!
//! - **One Current Location**: the repository enforces exactly one current town;
//!   a move flips it in a single transaction with the transport leg
//! - **Fallbacks, Not Failures**: generation and provider failures downgrade to
//!   the next tier (regeneration, backup towns, default places, fewer images)
//! - **Consumed Once**: a place featured in a published post is not featured
//!   again until every place of its kind at that town has been used
//! - **Seedable Randomness**: every random choice draws from one injectable `Dice`
//!
//! # Modules
//!
//! - [`cycle`] - Move-or-stay decision and the cycle runner
//! - [`planner`] - Next-destination planning with backup towns
//! - [`places`] - Lazy POI generation and daily selection
//! - [`dedup`] - Image sourcing through the used-content ledger
//! - [`content`] - Document assembly
//! - [`publisher`] - WordPress and file publishers
//! - [`providers`] - Image, weather and geocoding clients
//! - [`llm`] - Text generation clients and rate limiting
//! - [`state`] - Actor over the place repository
//! - [`geo`] - Distance and transport estimates
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod content;
pub mod cycle;
pub mod daemon;
pub mod dedup;
pub mod geo;
pub mod llm;
pub mod parse;
pub mod places;
pub mod planner;
pub mod prompts;
pub mod providers;
pub mod publisher;
pub mod random;
pub mod state;

// Re-export commonly used types
pub use config::{Config, Tunables};
pub use content::{ContentAssembler, ContentKind, Document, DocumentImage};
pub use cycle::{CycleError, CycleOutcome, CycleRunner, Decision, DecisionInput, MoveReason, build_runner, decide};
pub use daemon::Daemon;
pub use dedup::ImageSourcer;
pub use llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, create_client};
pub use parse::{ParseOutcome, parse_json_list};
pub use places::{DailySelection, PlaceSelector};
pub use planner::{PlanSource, PlannedCity, Planner};
pub use providers::{Geocoder, ImageProvider, ImageProviders, ImageRef, ProviderError, WeatherProvider, WeatherReport};
pub use publisher::{FilePublisher, PublishError, Published, Publisher, WordPressPublisher};
pub use random::Dice;
pub use state::{StateError, StateManager};
