//! One content cycle
//!
//! ```text
//! load current ──┬─ none, empty repo ─► plan first city ─► start journey ─► stay
//!                ├─ none, repo has rows ─► abort (invariant violation)
//!                └─ some ─► decide ─┬─ stay ─► select places ─► daily post ─► write back
//!                                   └─ move ─► plan ─► relocate ─► travel post ─► log post
//! ```

use std::sync::Arc;

use chrono::NaiveDate;
use placestore::{Location, NewPost, PoiKind, PostRecord};
use thiserror::Error;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use super::decision::{Decision, DecisionInput, decide};
use crate::config::{Config, Tunables};
use crate::content::{ContentAssembler, ContentError, ContentKind, DailyContext, Document, TravelContext};
use crate::geo::plan_leg;
use crate::places::PlaceSelector;
use crate::planner::Planner;
use crate::publisher::{PublishError, Published, Publisher};
use crate::random::Dice;
use crate::state::{StateError, StateManager};

/// Errors that abort a cycle
///
/// Persisted state is left as it was before the failing step; the next
/// scheduled cycle retries from there.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Content generation failed: {0}")]
    Generation(#[from] ContentError),

    #[error("Publishing failed: {0}")]
    Publish(#[from] PublishError),
}

/// What a completed cycle did
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub kind: ContentKind,
    /// Location the post was written at (the new one after a move)
    pub location: Location,
    pub post: PostRecord,
    /// The cycle created the first location
    pub started_journey: bool,
}

/// Drives the daily decision procedure
pub struct CycleRunner {
    config: Arc<Config>,
    state: StateManager,
    planner: Planner,
    selector: PlaceSelector,
    assembler: ContentAssembler,
    publisher: Arc<dyn Publisher>,
    dice: Arc<Dice>,
}

impl CycleRunner {
    pub fn new(
        config: Arc<Config>,
        state: StateManager,
        planner: Planner,
        selector: PlaceSelector,
        assembler: ContentAssembler,
        publisher: Arc<dyn Publisher>,
        dice: Arc<Dice>,
    ) -> Self {
        Self {
            config,
            state,
            planner,
            selector,
            assembler,
            publisher,
            dice,
        }
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Run one cycle for `date`
    pub async fn run(&self, date: NaiveDate) -> Result<CycleOutcome, CycleError> {
        let cycle_id = Uuid::now_v7();
        let span = info_span!("cycle", %cycle_id, %date);
        async {
            info!("Cycle started");
            let result = self.run_inner(date).await;
            match &result {
                Ok(outcome) => info!(
                    kind = %outcome.kind,
                    city = %outcome.location.name,
                    day = outcome.location.current_day,
                    url = %outcome.post.url,
                    "Cycle completed"
                ),
                Err(e) => error!(error = %e, "Cycle aborted"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_inner(&self, date: NaiveDate) -> Result<CycleOutcome, CycleError> {
        let tunables = self.tunables().await?;

        let (current, started_journey) = match self.state.current_location().await? {
            Some(location) => (location, false),
            None => (self.start_journey(date, &tunables).await?, true),
        };

        if started_journey {
            return self.stay(current, date, true).await;
        }

        let available = self.state.count_available(current.id, PoiKind::Attraction).await?;
        let input = DecisionInput::for_location(&current, tunables.min_days, tunables.max_days, available);
        match decide(input) {
            Decision::Stay => {
                debug!(day = current.current_day, planned = current.planned_duration, "run_inner: staying");
                self.stay(current, date, false).await
            }
            Decision::Move(reasons) => {
                let reasons: Vec<&str> = reasons.iter().map(|r| r.as_str()).collect();
                info!(
                    city = %current.name,
                    day = current.current_day,
                    planned = current.planned_duration,
                    reasons = %reasons.join(","),
                    "Moving on"
                );
                self.move_on(current, date, &tunables).await
            }
        }
    }

    /// Effective tunables; unusable stored settings fall back to the file values
    pub async fn tunables(&self) -> Result<Tunables, CycleError> {
        let settings = self.state.list_settings().await?;
        match self.config.tunables(&settings) {
            Ok(tunables) => Ok(tunables),
            Err(e) => {
                warn!(error = %e, "Ignoring stored settings");
                Ok(Tunables {
                    min_days: self.config.journey.min_days,
                    max_days: self.config.journey.max_days,
                    schedule: self.config.schedule.cron.clone(),
                })
            }
        }
    }

    async fn start_journey(&self, date: NaiveDate, tunables: &Tunables) -> Result<Location, CycleError> {
        let locations = self.state.list_locations().await?;
        if !locations.is_empty() {
            return Err(CycleError::InvariantViolation(format!(
                "{} locations stored but none is current",
                locations.len()
            )));
        }

        let planned = self.planner.select_next_city(None, &[]).await;
        let duration = self.dice.range(tunables.min_days, tunables.max_days);
        let first = self.state.start_journey(planned.location, date, duration).await?;
        info!(city = %first.name, country = %first.country, planned = duration, "Journey started");
        Ok(first)
    }

    async fn stay(&self, location: Location, date: NaiveDate, started_journey: bool) -> Result<CycleOutcome, CycleError> {
        let selection = self.selector.select(&location, date).await?;
        let document = self
            .assembler
            .daily(DailyContext {
                location: &location,
                date,
                attraction: &selection.attraction,
                restaurant: &selection.restaurant,
            })
            .await?;
        let published = self.publish(&document).await?;

        let post = self
            .state
            .complete_daily_post(selection.poi_ids(), date, new_post(&document, location.id, &published))
            .await?;
        let location = self
            .state
            .get_location(location.id)
            .await?
            .ok_or_else(|| CycleError::InvariantViolation(format!("location {} vanished", location.id)))?;

        Ok(CycleOutcome {
            kind: ContentKind::Daily,
            location,
            post,
            started_journey,
        })
    }

    async fn move_on(&self, current: Location, date: NaiveDate, tunables: &Tunables) -> Result<CycleOutcome, CycleError> {
        let history = self.state.list_locations().await?;
        let planned = self.planner.select_next_city(Some(&current.country), &history).await;

        let leg = plan_leg(current.coordinates, planned.location.coordinates, date);
        let duration = self.dice.range(tunables.min_days, tunables.max_days);
        let (next, leg) = self
            .state
            .relocate(current.id, planned.location, date, duration, leg)
            .await?;
        info!(
            from = %current.name,
            to = %next.name,
            mode = %leg.mode,
            distance_km = leg.distance_km,
            planned = duration,
            "Relocated"
        );

        let document = self
            .assembler
            .travel(TravelContext {
                from: &current,
                to: &next,
                leg: &leg,
                date,
            })
            .await?;
        let published = self.publish(&document).await?;
        let post = self.state.record_post(new_post(&document, next.id, &published)).await?;

        Ok(CycleOutcome {
            kind: ContentKind::Travel,
            location: next,
            post,
            started_journey: false,
        })
    }

    async fn publish(&self, document: &Document) -> Result<Published, CycleError> {
        debug!(publisher = self.publisher.name(), title = %document.title, "publish: called");
        let published = self.publisher.publish(document).await?;
        info!(publisher = self.publisher.name(), id = %published.id, url = %published.url, "Published");
        Ok(published)
    }
}

fn new_post(document: &Document, location_id: i64, published: &Published) -> NewPost {
    NewPost {
        kind: document.kind.into(),
        location_id,
        post_date: document.date,
        remote_id: published.id.clone(),
        url: published.url.clone(),
        title: document.title.clone(),
        tags: document.tags.clone(),
    }
}
