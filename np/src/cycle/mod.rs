//! Daily decision procedure
//!
//! Each cycle either stays (select places, daily post, advance the day) or
//! moves (plan the next town, relocate, travel post). `build_runner` wires the
//! production collaborators from configuration.

use std::path::Path;
use std::sync::Arc;

use eyre::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::content::ContentAssembler;
use crate::dedup::ImageSourcer;
use crate::llm::create_client;
use crate::places::PlaceSelector;
use crate::planner::Planner;
use crate::prompts::PromptLoader;
use crate::providers::{Geocoder, NominatimGeocoder, OpenWeatherProvider, WeatherProvider, build_image_providers};
use crate::publisher::create_publisher;
use crate::random::Dice;
use crate::state::StateManager;

mod decision;
mod runner;

pub use decision::{Decision, DecisionInput, MoveReason, decide, should_move};
pub use runner::{CycleError, CycleOutcome, CycleRunner};

/// Directory checked for prompt overrides before the embedded templates
pub const PROMPT_OVERRIDE_DIR: &str = ".nomadpost/prompts";

/// Build a runner with the configured LLM, providers and publisher
pub fn build_runner(config: Arc<Config>, state: StateManager) -> Result<CycleRunner> {
    debug!("build_runner: called");
    let llm = create_client(&config.llm).context("Failed to create LLM client")?;
    let prompts = Arc::new(PromptLoader::new(Path::new(PROMPT_OVERRIDE_DIR)));
    let dice = Arc::new(match config.journey.seed {
        Some(seed) => Dice::seeded(seed),
        None => Dice::from_entropy(),
    });

    let images = build_image_providers(&config.images);
    if images.is_empty() {
        warn!("No image provider configured, posts will have no images");
    } else {
        info!(providers = ?images.names(), "Image providers ready");
    }

    let weather: Option<Arc<dyn WeatherProvider>> = match OpenWeatherProvider::from_config(&config.weather) {
        Ok(Some(provider)) => Some(Arc::new(provider)),
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "Weather lookups disabled");
            None
        }
    };
    let geocoder: Option<Arc<dyn Geocoder>> = match NominatimGeocoder::from_config(&config.geocoder) {
        Ok(Some(geocoder)) => Some(Arc::new(geocoder)),
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "Geocoding disabled");
            None
        }
    };
    let publisher = create_publisher(&config.publisher).context("Failed to create publisher")?;

    let planner = Planner::new(
        llm.clone(),
        prompts.clone(),
        geocoder,
        dice.clone(),
        config.journey.start_country.clone(),
        config.journey.candidate_count,
    );
    let selector = PlaceSelector::new(
        llm.clone(),
        prompts.clone(),
        state.clone(),
        dice.clone(),
        config.journey.poi_count,
    );
    let assembler = ContentAssembler::new(
        llm,
        prompts,
        ImageSourcer::new(Arc::new(images), state.clone()),
        weather,
        config.images.per_post,
        config.llm.max_tokens,
    );

    info!(publisher = publisher.name(), "Cycle runner ready");
    Ok(CycleRunner::new(config, state, planner, selector, assembler, publisher, dice))
}
