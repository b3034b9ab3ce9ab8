//! End-to-end journey tests
//!
//! Cycles run against an in-memory place store with scripted text generation,
//! a paged image source and a publisher that records what it receives.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, TimeDelta};
use nomadpost::config::Config;
use nomadpost::content::{ContentAssembler, ContentKind, Document};
use nomadpost::cycle::{CycleError, CycleRunner};
use nomadpost::dedup::ImageSourcer;
use nomadpost::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError};
use nomadpost::places::PlaceSelector;
use nomadpost::planner::{PlanSource, Planner, backups_for, locale_for};
use nomadpost::prompts::PromptLoader;
use nomadpost::providers::{ImageProvider, ImageRef, ProviderError};
use nomadpost::publisher::{PublishError, Published, Publisher};
use nomadpost::random::Dice;
use nomadpost::state::StateManager;
use placestore::{Coordinates, Location, PoiKind, PostKind};

// =============================================================================
// Collaborators
// =============================================================================

/// Answers by prompt shape: country choice, town list, POI list or post prose
struct RoutedLlm {
    next_country: Mutex<String>,
    /// Same three towns per country on every call, so history filtering matters
    fixed_towns: bool,
    counter: AtomicUsize,
    calls: AtomicUsize,
}

impl RoutedLlm {
    fn new(next_country: &str, fixed_towns: bool) -> Self {
        Self {
            next_country: Mutex::new(next_country.to_string()),
            fixed_towns,
            counter: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    fn next(&self) -> usize {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn towns(&self, prompt: &str) -> String {
        let country = prompt
            .split("small towns in ")
            .nth(1)
            .and_then(|rest| rest.split(" for a slow-travel").next())
            .unwrap_or("Nowhere")
            .to_string();
        let names: Vec<String> = if self.fixed_towns {
            ["A", "B", "C"].iter().map(|s| format!("{} Town {}", country, s)).collect()
        } else {
            (0..3).map(|_| format!("{} Town {}", country, self.next())).collect()
        };
        let towns: Vec<serde_json::Value> = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                serde_json::json!({
                    "name": name,
                    "region": "Somewhere",
                    "population": 9000,
                    "coordinates": {"lat": 44.0 + i as f64 * 0.3, "lng": 16.0 + i as f64 * 0.4},
                })
            })
            .collect();
        serde_json::Value::Array(towns).to_string()
    }

    fn pois(&self, prompt: &str) -> String {
        let label = if prompt.contains(" restaurants in ") {
            "Restaurant"
        } else {
            "Attraction"
        };
        let items: Vec<serde_json::Value> = (0..2)
            .map(|_| {
                serde_json::json!({
                    "name": format!("{} {}", label, self.next()),
                    "description": "Worth it.",
                    "openingHours": {"weekday": "00:00-23:59", "weekend": "00:00-23:59"},
                })
            })
            .collect();
        serde_json::Value::Array(items).to_string()
    }
}

#[async_trait]
impl LlmClient for RoutedLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = request.messages.first().map(|m| m.content.clone()).unwrap_or_default();

        let text = if prompt.contains("Choose the country for the next stop") {
            self.next_country.lock().unwrap().clone()
        } else if prompt.contains("small towns in ") {
            self.towns(&prompt)
        } else if prompt.starts_with("List ") {
            self.pois(&prompt)
        } else if prompt.contains("about moving on") {
            "# On the road again\n\nThe bus smelled of coffee.".to_string()
        } else {
            "# A slow day\n\nI walked, I ate, I wrote.\n\nThen I slept.".to_string()
        };
        Ok(CompletionResponse::text(text))
    }
}

/// Page N always yields asset `pN`, whatever the query
struct PagedImages;

#[async_trait]
impl ImageProvider for PagedImages {
    fn name(&self) -> &str {
        "paged"
    }

    async fn search(&self, query: &str, page: u32) -> Result<Option<ImageRef>, ProviderError> {
        Ok(Some(ImageRef {
            provider: "paged".to_string(),
            asset_id: Some(format!("p{}", page)),
            url: format!("https://img.test/p{}.jpg", page),
            description: query.to_string(),
            author: "Tester".to_string(),
            author_url: None,
        }))
    }

    async fn fetch(&self, image: &ImageRef) -> Result<Vec<u8>, ProviderError> {
        Ok(image.url.as_bytes().to_vec())
    }
}

#[derive(Default)]
struct RecordingPublisher {
    documents: Mutex<Vec<Document>>,
    fail: AtomicBool,
}

impl RecordingPublisher {
    fn documents(&self) -> Vec<Document> {
        self.documents.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    fn name(&self) -> &str {
        "recording"
    }

    async fn publish(&self, document: &Document) -> Result<Published, PublishError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PublishError::Status {
                status: 502,
                message: "bad gateway".to_string(),
            });
        }
        let mut documents = self.documents.lock().unwrap();
        documents.push(document.clone());
        let n = documents.len();
        Ok(Published {
            id: n.to_string(),
            url: format!("https://blog.test/{}", n),
        })
    }
}

// =============================================================================
// Harness
// =============================================================================

struct Harness {
    state: StateManager,
    llm: Arc<RoutedLlm>,
    publisher: Arc<RecordingPublisher>,
    runner: CycleRunner,
}

fn harness(min_days: u32, max_days: u32, seed: u64, llm: RoutedLlm) -> Harness {
    let state = StateManager::spawn_in_memory().expect("in-memory store");
    let llm = Arc::new(llm);
    let publisher = Arc::new(RecordingPublisher::default());

    let mut config = Config::default();
    config.journey.min_days = min_days;
    config.journey.max_days = max_days;

    let dice = Arc::new(Dice::seeded(seed));
    let prompts = Arc::new(PromptLoader::embedded_only());
    let planner = Planner::new(llm.clone(), prompts.clone(), None, dice.clone(), "Serbia", 3);
    let selector = PlaceSelector::new(llm.clone(), prompts.clone(), state.clone(), dice.clone(), 2);
    let assembler = ContentAssembler::new(
        llm.clone(),
        prompts,
        ImageSourcer::new(Arc::new(PagedImages), state.clone()),
        None,
        2,
        1024,
    );
    let runner = CycleRunner::new(
        Arc::new(config),
        state.clone(),
        planner,
        selector,
        assembler,
        publisher.clone(),
        dice,
    );

    Harness {
        state,
        llm,
        publisher,
        runner,
    }
}

fn day(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 3).unwrap() + TimeDelta::days(n)
}

async fn assert_invariants(state: &StateManager) {
    let locations = state.list_locations().await.unwrap();
    assert_eq!(
        locations.iter().filter(|l| l.is_current).count(),
        1,
        "exactly one current location"
    );

    let mut orders: Vec<u32> = locations.iter().map(|l| l.order_in_journey).collect();
    orders.sort_unstable();
    let expected: Vec<u32> = (1..=locations.len() as u32).collect();
    assert_eq!(orders, expected, "orders contiguous from 1");

    let mut seen = HashSet::new();
    for location in &locations {
        let key = (location.name.to_lowercase(), location.country.to_lowercase());
        assert!(seen.insert(key), "{} repeated", location.name);
    }

    let legs = state.list_legs().await.unwrap();
    assert_eq!(legs.len(), locations.len() - 1);
    for location in locations.iter().filter(|l| l.order_in_journey > 1) {
        assert_eq!(
            legs.iter().filter(|l| l.to_location_id == location.id).count(),
            1,
            "one leg into {}",
            location.name
        );
    }
}

// =============================================================================
// Cycle Tests
// =============================================================================

#[tokio::test]
async fn test_first_cycle_starts_journey_with_daily_post() {
    let h = harness(2, 3, 1, RoutedLlm::new("Croatia", false));

    let outcome = h.runner.run(day(0)).await.unwrap();
    assert!(outcome.started_journey);
    assert_eq!(outcome.kind, ContentKind::Daily);
    assert_eq!(outcome.location.country, "Serbia");
    assert_eq!(outcome.location.order_in_journey, 1);
    assert!(outcome.location.is_current);
    assert_eq!(outcome.location.current_day, 2);
    assert!((2..=3).contains(&outcome.location.planned_duration));
    assert_eq!(outcome.post.kind, PostKind::Daily);
    assert_eq!(outcome.post.remote_id, "1");

    let documents = h.publisher.documents();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].title, "A slow day");
    assert!(documents[0].tags.contains(&"Serbia".to_string()));
    assert_invariants(&h.state).await;
}

#[tokio::test]
async fn test_planned_duration_reached_moves_with_travel_post_only() {
    let h = harness(2, 2, 2, RoutedLlm::new("Croatia", false));

    let first = h.runner.run(day(0)).await.unwrap();
    let second = h.runner.run(day(1)).await.unwrap();

    assert_eq!(second.kind, ContentKind::Travel);
    assert_eq!(second.location.country, "Croatia");
    assert_eq!(second.location.current_day, 1);
    assert_eq!(second.location.order_in_journey, 2);
    assert_eq!(second.post.kind, PostKind::Travel);
    assert_eq!(second.post.location_id, second.location.id);

    let previous = h.state.get_location(first.location.id).await.unwrap().unwrap();
    assert!(!previous.is_current);
    assert!(previous.is_visited);

    let leg = h.state.leg_into(second.location.id).await.unwrap().unwrap();
    assert_eq!(leg.from_location_id, first.location.id);

    let documents = h.publisher.documents();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[1].kind, ContentKind::Travel);
    assert_eq!(documents[1].title, "On the road again");

    // Next cycle is a daily post at the new town
    let third = h.runner.run(day(2)).await.unwrap();
    assert_eq!(third.kind, ContentKind::Daily);
    assert_eq!(third.location.id, second.location.id);
    assert_eq!(third.location.current_day, 2);
    assert_invariants(&h.state).await;
}

#[tokio::test]
async fn test_long_journey_keeps_invariants_and_never_repeats() {
    let h = harness(1, 2, 7, RoutedLlm::new("Croatia", true));

    let mut moves = 0;
    for n in 0..45 {
        let outcome = h.runner.run(day(n)).await.unwrap();
        if outcome.kind == ContentKind::Travel {
            moves += 1;
        }
        assert_invariants(&h.state).await;
    }

    let locations = h.state.list_locations().await.unwrap();
    assert_eq!(locations.len(), moves + 1);
    // Three generated Croatian towns and four backups run out, so other countries follow
    assert!(locations.len() > 8);
    assert!(locations.iter().any(|l| l.country != "Serbia" && l.country != "Croatia"));
}

#[tokio::test]
async fn test_consumed_attractions_not_reselected_until_regenerated() {
    let h = harness(10, 10, 3, RoutedLlm::new("Croatia", false));

    let mut featured = Vec::new();
    for n in 0..5 {
        let outcome = h.runner.run(day(n)).await.unwrap();
        assert_eq!(outcome.kind, ContentKind::Daily);
        let documents = h.publisher.documents();
        let tags = &documents.last().unwrap().tags;
        let attraction = tags.iter().find(|t| t.starts_with("Attraction ")).unwrap().clone();
        featured.push(attraction);
    }

    let distinct: HashSet<&String> = featured.iter().collect();
    assert_eq!(distinct.len(), featured.len(), "attractions repeated: {:?}", featured);

    let location = h.state.current_location().await.unwrap().unwrap();
    // Batches of two: five days consumed three batches' worth of generation calls
    let attractions = h.state.list_pois(location.id, PoiKind::Attraction).await.unwrap();
    assert_eq!(attractions.len(), 6);
    assert_eq!(h.state.count_available(location.id, PoiKind::Attraction).await.unwrap(), 1);
}

#[tokio::test]
async fn test_publish_failure_leaves_state_unchanged() {
    let h = harness(5, 5, 4, RoutedLlm::new("Croatia", false));
    let first = h.runner.run(day(0)).await.unwrap();
    let available = h
        .state
        .count_available(first.location.id, PoiKind::Attraction)
        .await
        .unwrap();

    h.publisher.fail.store(true, Ordering::SeqCst);
    let result = h.runner.run(day(1)).await;
    assert!(matches!(result, Err(CycleError::Publish(_))));

    let current = h.state.current_location().await.unwrap().unwrap();
    assert_eq!(current.id, first.location.id);
    assert_eq!(current.current_day, 2);
    assert_eq!(h.state.list_posts(10).await.unwrap().len(), 1);
    assert_eq!(
        h.state
            .count_available(first.location.id, PoiKind::Attraction)
            .await
            .unwrap(),
        available
    );

    // The next tick retries from the same state
    h.publisher.fail.store(false, Ordering::SeqCst);
    let retried = h.runner.run(day(1)).await.unwrap();
    assert_eq!(retried.location.current_day, 3);
    assert_invariants(&h.state).await;
}

#[tokio::test]
async fn test_images_are_not_reused_across_posts() {
    let h = harness(10, 10, 5, RoutedLlm::new("Croatia", false));
    h.runner.run(day(0)).await.unwrap();
    h.runner.run(day(1)).await.unwrap();
    h.runner.run(day(2)).await.unwrap();

    let documents = h.publisher.documents();
    let ids: Vec<Vec<String>> = documents
        .iter()
        .map(|d| d.images.iter().filter_map(|i| i.image.asset_id.clone()).collect())
        .collect();
    assert_eq!(ids[0], vec!["p1", "p2"]);
    assert_eq!(ids[1], vec!["p3", "p4"]);
    // Four variations exhausted: the last duplicate is accepted rather than posting nothing
    assert_eq!(ids[2], vec!["p4"]);
    assert!(h.state.has_fingerprint("paged:p3").await.unwrap());
    assert_eq!(documents[0].images[0].bytes, b"https://img.test/p1.jpg".to_vec());
}

#[tokio::test]
async fn test_stored_settings_override_config() {
    let h = harness(10, 10, 6, RoutedLlm::new("Croatia", false));
    h.runner.run(day(0)).await.unwrap();

    h.state.set_setting("max-days-per-location", "2").await.unwrap();
    h.state.set_setting("min-days-per-location", "1").await.unwrap();
    let tunables = h.runner.tunables().await.unwrap();
    assert_eq!((tunables.min_days, tunables.max_days), (1, 2));

    // Day 2 reaches the stored max-days cap
    let outcome = h.runner.run(day(1)).await.unwrap();
    assert_eq!(outcome.kind, ContentKind::Travel);
}

#[tokio::test]
async fn test_seeded_runs_are_reproducible() {
    async fn itinerary(seed: u64) -> Vec<String> {
        let h = harness(1, 3, seed, RoutedLlm::new("Slovenia", true));
        for n in 0..15 {
            h.runner.run(day(n)).await.unwrap();
        }
        let locations = h.state.list_locations().await.unwrap();
        assert!(h.llm.calls.load(Ordering::SeqCst) > 0);
        locations.into_iter().map(|l| format!("{}/{}", l.name, l.planned_duration)).collect()
    }

    assert_eq!(itinerary(42).await, itinerary(42).await);
}

// =============================================================================
// Planner Fallbacks
// =============================================================================

fn visited(order: u32, name: &str, country: &str) -> Location {
    Location {
        id: order as i64,
        name: name.to_string(),
        country: country.to_string(),
        region: String::new(),
        coordinates: Coordinates::new(44.8, 20.4),
        locale: locale_for(country),
        is_current: false,
        is_visited: true,
        planned_arrival: day(0),
        planned_duration: 7,
        current_day: 8,
        order_in_journey: order,
        created_at: 0,
    }
}

/// Town lists that never parse
struct Mumbling;

#[async_trait]
impl LlmClient for Mumbling {
    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        Ok(CompletionResponse::text("Let me think about that for a while..."))
    }
}

#[tokio::test]
async fn test_exhausted_serbian_backups_fall_back_to_another_country() {
    let history: Vec<Location> = backups_for("Serbia")
        .iter()
        .enumerate()
        .map(|(i, town)| visited(i as u32 + 1, town.name, town.country))
        .collect();
    let planner = Planner::new(
        Arc::new(Mumbling),
        Arc::new(PromptLoader::embedded_only()),
        None,
        Arc::new(Dice::seeded(8)),
        "Serbia",
        5,
    );

    let planned = planner.select_next_city(None, &history).await;
    assert_eq!(planned.source, PlanSource::OtherCountryBackup);
    assert_ne!(planned.location.country, "Serbia");
    assert!(planned.location.coordinates.is_valid());
}
