//! Place selection and lazy POI generation

use std::sync::Arc;

use chrono::NaiveDate;
use placestore::{Location, NewPoi, OpeningHours, Poi, PoiKind, same_name};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::hours::open_yesterday;
use crate::llm::{GenerationOptions, LlmClient, generate};
use crate::parse::parse_json_list;
use crate::prompts::PromptLoader;
use crate::random::Dice;
use crate::state::{StateError, StateManager};

const STRUCTURED_MAX_TOKENS: u32 = 1536;

/// The day's featured places
#[derive(Debug, Clone, PartialEq)]
pub struct DailySelection {
    pub attraction: Poi,
    pub restaurant: Poi,
}

impl DailySelection {
    pub fn poi_ids(&self) -> Vec<i64> {
        vec![self.attraction.id, self.restaurant.id]
    }
}

#[derive(Debug, Deserialize)]
struct GeneratedPoi {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default, rename = "openingHours", alias = "opening_hours")]
    opening_hours: OpeningHours,
    #[serde(default)]
    website: Option<String>,
}

impl GeneratedPoi {
    fn into_new_poi(self, kind: PoiKind) -> NewPoi {
        NewPoi {
            kind,
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            opening_hours: self.opening_hours,
            website: self
                .website
                .map(|w| w.trim().to_string())
                .filter(|w| w.starts_with("http://") || w.starts_with("https://")),
        }
    }
}

fn plural(kind: PoiKind) -> &'static str {
    match kind {
        PoiKind::Attraction => "attractions",
        PoiKind::Restaurant => "restaurants",
    }
}

/// Generic place used when generation yields nothing
pub fn default_poi(kind: PoiKind, city: &str) -> NewPoi {
    let (name, description) = match kind {
        PoiKind::Attraction => (
            format!("Historic Center of {}", city),
            format!("A slow walk through the old streets and squares of {}.", city),
        ),
        PoiKind::Restaurant => (
            format!("Local Restaurant in {}", city),
            format!("A small family-run place serving the regional dishes of {}.", city),
        ),
    };
    NewPoi {
        kind,
        name,
        description,
        opening_hours: OpeningHours::always_open(),
        website: None,
    }
}

/// Picks one available attraction and one available restaurant per day
pub struct PlaceSelector {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    state: StateManager,
    dice: Arc<Dice>,
    poi_count: usize,
}

impl PlaceSelector {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        prompts: Arc<PromptLoader>,
        state: StateManager,
        dice: Arc<Dice>,
        poi_count: usize,
    ) -> Self {
        Self {
            llm,
            prompts,
            state,
            dice,
            poi_count: poi_count.max(1),
        }
    }

    /// Today's attraction and restaurant for `location`
    ///
    /// Never returns an empty selection; only repository failures are errors.
    pub async fn select(&self, location: &Location, date: NaiveDate) -> Result<DailySelection, StateError> {
        debug!(city = %location.name, %date, "PlaceSelector::select: called");
        let attraction = self.select_kind(location, PoiKind::Attraction, date).await?;
        let restaurant = self.select_kind(location, PoiKind::Restaurant, date).await?;
        info!(
            city = %location.name,
            attraction = %attraction.name,
            restaurant = %restaurant.name,
            "Places selected"
        );
        Ok(DailySelection { attraction, restaurant })
    }

    async fn select_kind(&self, location: &Location, kind: PoiKind, date: NaiveDate) -> Result<Poi, StateError> {
        let available = self.ensure_available(location, kind).await?;
        self.choose(available, date)
            .ok_or_else(|| StateError::NotFound(format!("no {} available at {}", kind, location.name)))
    }

    /// Available POIs of a kind, generating a fresh batch when none are left
    pub async fn ensure_available(&self, location: &Location, kind: PoiKind) -> Result<Vec<Poi>, StateError> {
        debug!(location_id = location.id, %kind, "ensure_available: called");
        let available = self.state.available_pois(location.id, kind).await?;
        if !available.is_empty() {
            return Ok(available);
        }

        let existing: Vec<String> = self
            .state
            .list_pois(location.id, kind)
            .await?
            .into_iter()
            .map(|p| p.name)
            .collect();
        info!(city = %location.name, %kind, known = existing.len(), "No {} left, generating", plural(kind));

        let mut fresh = self.generate_pois(location, kind, &existing).await;
        if fresh.is_empty() {
            warn!(city = %location.name, %kind, "Generation produced nothing, using default");
            fresh.push(default_poi(kind, &location.name));
        }
        self.state.insert_pois(location.id, fresh).await
    }

    async fn generate_pois(&self, location: &Location, kind: PoiKind, existing: &[String]) -> Vec<NewPoi> {
        let context = json!({
            "count": self.poi_count,
            "kind_plural": plural(kind),
            "restaurant": kind == PoiKind::Restaurant,
            "city": location.name,
            "country": location.country,
            "existing": existing.join(", "),
        });
        let prompt = match self.prompts.render("pois", &context) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(error = %e, "Failed to render pois prompt");
                return Vec::new();
            }
        };
        let text = match generate(self.llm.as_ref(), &prompt, GenerationOptions::structured(STRUCTURED_MAX_TOKENS)).await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(city = %location.name, %kind, error = %e, "POI generation failed");
                return Vec::new();
            }
        };

        let mut pois: Vec<NewPoi> = Vec::new();
        for generated in parse_json_list::<GeneratedPoi>(&text).into_list() {
            let poi = generated.into_new_poi(kind);
            let repeat = poi.name.is_empty()
                || existing.iter().any(|n| same_name(n, &poi.name))
                || pois.iter().any(|p| same_name(&p.name, &poi.name));
            if repeat {
                debug!(name = %poi.name, "generate_pois: skipping repeat");
                continue;
            }
            pois.push(poi);
        }
        debug!(city = %location.name, %kind, count = pois.len(), "generate_pois: parsed");
        pois
    }

    /// Uniform pick among places open yesterday, or among all when none were
    pub fn choose(&self, mut pois: Vec<Poi>, date: NaiveDate) -> Option<Poi> {
        let open: Vec<usize> = pois
            .iter()
            .enumerate()
            .filter(|(_, p)| open_yesterday(&p.opening_hours, date))
            .map(|(i, _)| i)
            .collect();

        let index = if open.is_empty() {
            debug!(count = pois.len(), "choose: nothing open yesterday, using all");
            self.dice.index(pois.len())?
        } else {
            *self.dice.pick(&open)?
        };
        Some(pois.swap_remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockLlmClient;
    use placestore::{Coordinates, Locale, NewLocation, NewPost, PostKind};

    async fn setup() -> (StateManager, Location) {
        let state = StateManager::spawn_in_memory().unwrap();
        let location = state
            .start_journey(
                NewLocation {
                    name: "Ston".to_string(),
                    country: "Croatia".to_string(),
                    region: "Dubrovnik-Neretva".to_string(),
                    coordinates: Coordinates::new(42.84, 17.70),
                    locale: Locale {
                        timezone: "Europe/Zagreb".to_string(),
                        currency: "EUR".to_string(),
                        language: "Croatian".to_string(),
                    },
                },
                date(),
                10,
            )
            .await
            .unwrap();
        (state, location)
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 4).unwrap()
    }

    fn selector(state: &StateManager, llm: Arc<MockLlmClient>) -> PlaceSelector {
        PlaceSelector::new(
            llm,
            Arc::new(PromptLoader::embedded_only()),
            state.clone(),
            Arc::new(Dice::seeded(4)),
            5,
        )
    }

    const WALLS: &str = r#"[
        {"name": "Walls of Ston", "description": "Medieval walls.", "openingHours": {"weekday": "08:00-19:00", "weekend": "08:00-19:00"}, "website": "https://walls.example"},
        {"name": "Salt Works", "description": "Old salt pans.", "openingHours": {"weekday": "closed", "weekend": "closed"}, "website": "null"}
    ]"#;

    const FOOD: &str = r#"{"restaurants": [{"name": "Bota Šare", "description": "Oysters."}]}"#;

    #[tokio::test]
    async fn test_generates_on_first_use_and_prefers_open_places() {
        let (state, location) = setup().await;
        let llm = Arc::new(MockLlmClient::texts(&[WALLS, FOOD]));
        let selection = selector(&state, llm.clone()).select(&location, date()).await.unwrap();

        assert_eq!(selection.attraction.name, "Walls of Ston");
        assert_eq!(selection.restaurant.name, "Bota Šare");
        assert_eq!(llm.call_count(), 2);

        let pois = state.list_pois(location.id, PoiKind::Attraction).await.unwrap();
        assert_eq!(pois.len(), 2);
        assert_eq!(pois[1].website, None);
    }

    #[tokio::test]
    async fn test_selection_is_read_only() {
        let (state, location) = setup().await;
        let llm = Arc::new(MockLlmClient::texts(&[WALLS, FOOD]));
        let selector = selector(&state, llm.clone());
        selector.select(&location, date()).await.unwrap();

        let before = state.available_pois(location.id, PoiKind::Attraction).await.unwrap();
        selector.select(&location, date()).await.unwrap();
        let after = state.available_pois(location.id, PoiKind::Attraction).await.unwrap();
        assert_eq!(before, after);
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_generation_failure_falls_back_to_default() {
        let (state, location) = setup().await;
        let llm = Arc::new(MockLlmClient::scripted(vec![Err("down".to_string())]));
        let selection = selector(&state, llm).select(&location, date()).await.unwrap();

        assert_eq!(selection.attraction.name, "Historic Center of Ston");
        assert_eq!(selection.restaurant.name, "Local Restaurant in Ston");
        assert_eq!(selection.attraction.opening_hours, OpeningHours::always_open());
    }

    #[tokio::test]
    async fn test_exhausted_kind_regenerates_without_repeats() {
        let (state, location) = setup().await;
        let llm = Arc::new(MockLlmClient::texts(&[
            r#"[{"name": "Walls of Ston"}]"#,
            FOOD,
            r#"[{"name": "walls of ston"}, {"name": "Mali Ston Bay"}]"#,
        ]));
        let selector = selector(&state, llm.clone());
        let first = selector.select(&location, date()).await.unwrap();
        let post = NewPost {
            kind: PostKind::Daily,
            location_id: location.id,
            post_date: date(),
            remote_id: "1".to_string(),
            url: "file:///tmp/1".to_string(),
            title: "Day one".to_string(),
            tags: vec![],
        };
        state.complete_daily_post(first.poi_ids(), date(), post).await.unwrap();

        let attraction = selector.select_kind(&location, PoiKind::Attraction, date()).await.unwrap();
        assert_eq!(attraction.name, "Mali Ston Bay");
        assert!(llm.prompts()[2].contains("Walls of Ston"));
    }

    #[tokio::test]
    async fn test_regeneration_skips_accented_names_in_other_case() {
        let (state, location) = setup().await;
        let llm = Arc::new(MockLlmClient::texts(&[
            r#"[{"name": "Crkva Svetog Đorđa"}]"#,
            FOOD,
            r#"[{"name": "CRKVA SVETOG ĐORĐA"}, {"name": "Solana Ston"}, {"name": "SOLANA STON"}]"#,
        ]));
        let selector = selector(&state, llm.clone());
        let first = selector.select(&location, date()).await.unwrap();
        let post = NewPost {
            kind: PostKind::Daily,
            location_id: location.id,
            post_date: date(),
            remote_id: "1".to_string(),
            url: "file:///tmp/1".to_string(),
            title: "Day one".to_string(),
            tags: vec![],
        };
        state.complete_daily_post(first.poi_ids(), date(), post).await.unwrap();

        let attraction = selector.select_kind(&location, PoiKind::Attraction, date()).await.unwrap();
        assert_eq!(attraction.name, "Solana Ston");
        let names: Vec<String> = state
            .list_pois(location.id, PoiKind::Attraction)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Crkva Svetog Đorđa", "Solana Ston"]);
    }

    #[tokio::test]
    async fn test_choose_falls_back_when_nothing_open() {
        let dice = Arc::new(Dice::seeded(1));
        let selector = PlaceSelector {
            llm: Arc::new(MockLlmClient::texts(&[])),
            prompts: Arc::new(PromptLoader::embedded_only()),
            state: StateManager::spawn_in_memory().unwrap(),
            dice,
            poi_count: 5,
        };
        let closed = Poi {
            id: 1,
            location_id: 1,
            kind: PoiKind::Attraction,
            name: "Shut".to_string(),
            description: String::new(),
            opening_hours: OpeningHours {
                weekday: Some("closed".to_string()),
                weekend: Some("closed".to_string()),
            },
            website: None,
            created_at: 0,
        };
        assert_eq!(selector.choose(vec![closed.clone()], date()).unwrap().name, "Shut");
        assert!(selector.choose(vec![], date()).is_none());
    }
}
