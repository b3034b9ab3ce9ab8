//! Next-destination planning
//!
//! `select_next_city` never fails. Each tier hands over to the next when it
//! comes up empty:
//!
//! 1. generated candidates for the chosen country, filtered against history
//! 2. one regeneration with a larger candidate count
//! 3. backup towns of the chosen country
//! 4. backup towns of another country
//! 5. a synthetic location near a backup town

use std::sync::Arc;

use placestore::{Coordinates, Location, NewLocation, same_name};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::catalog::{
    BACKUP_TOWNS, BackupTown, PRIORITY_COUNTRIES, SECONDARY_COUNTRIES, backups_for, locale_for, resolve_country,
};
use crate::llm::{GenerationOptions, LlmClient, generate};
use crate::parse::parse_json_list;
use crate::prompts::PromptLoader;
use crate::providers::Geocoder;
use crate::random::Dice;

/// Regeneration asks for this many times the normal candidate count
pub const RETRY_FACTOR: f64 = 1.6;

/// Maximum coordinate jitter for synthetic locations, in degrees
pub const SYNTHETIC_OFFSET_DEG: f64 = 0.05;

/// How many recent countries the country prompt mentions
const RECENT_COUNTRIES: usize = 3;

const STRUCTURED_MAX_TOKENS: u32 = 1024;

/// Which tier produced the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanSource {
    Generated,
    Regenerated,
    Backup,
    OtherCountryBackup,
    Synthetic,
}

/// The chosen destination and how it was found
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCity {
    pub location: NewLocation,
    pub source: PlanSource,
}

#[derive(Debug, Deserialize)]
struct CityCandidate {
    name: String,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    coordinates: Option<Coordinates>,
}

/// Itinerary planner
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    geocoder: Option<Arc<dyn Geocoder>>,
    dice: Arc<Dice>,
    start_country: String,
    candidate_count: usize,
}

impl Planner {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        prompts: Arc<PromptLoader>,
        geocoder: Option<Arc<dyn Geocoder>>,
        dice: Arc<Dice>,
        start_country: impl Into<String>,
        candidate_count: usize,
    ) -> Self {
        Self {
            llm,
            prompts,
            geocoder,
            dice,
            start_country: start_country.into(),
            candidate_count: candidate_count.max(1),
        }
    }

    /// Choose the next destination
    ///
    /// `current_country` is None at journey start. `history` holds every
    /// location so far, current included; none of them is ever returned again.
    pub async fn select_next_city(&self, current_country: Option<&str>, history: &[Location]) -> PlannedCity {
        debug!(?current_country, history = history.len(), "select_next_city: called");

        let country = match current_country {
            None => self.start_country.clone(),
            Some(current) => self.choose_country(current, history).await,
        };
        info!(%country, "Planning next destination");

        let candidates = self.generate_candidates(&country, self.candidate_count, history).await;
        let fresh = filter_unvisited(candidates, history);
        if let Some(location) = self.pick(fresh) {
            return planned(location, PlanSource::Generated);
        }

        let larger = (self.candidate_count as f64 * RETRY_FACTOR).ceil() as usize;
        info!(%country, count = larger, "No usable candidates, regenerating");
        let candidates = self.generate_candidates(&country, larger, history).await;
        let fresh = filter_unvisited(candidates, history);
        if let Some(location) = self.pick(fresh) {
            return planned(location, PlanSource::Regenerated);
        }

        self.fall_back(&country, history)
    }

    /// Ask the generator for the next country; a failed call or an answer
    /// naming no known country picks a random priority country instead
    async fn choose_country(&self, current: &str, history: &[Location]) -> String {
        debug!(%current, "choose_country: called");
        let context = json!({
            "current_country": current,
            "priority": PRIORITY_COUNTRIES.join(", "),
            "secondary": SECONDARY_COUNTRIES.join(", "),
            "recent": recent_countries(history).join(", "),
        });

        let answer = match self.prompts.render("country", &context) {
            Ok(prompt) => generate(self.llm.as_ref(), &prompt, GenerationOptions::structured(64))
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match answer {
            Ok(text) => match resolve_country(&text, Some(current)) {
                Some(country) => {
                    debug!(%country, "choose_country: generator chose");
                    return country.to_string();
                }
                None => warn!(answer = %text.trim(), "Country answer not recognized, picking at random"),
            },
            Err(e) => warn!(error = %e, "Country selection failed, picking at random"),
        }
        self.random_priority_country(current)
    }

    fn random_priority_country(&self, current: &str) -> String {
        let options: Vec<&str> = PRIORITY_COUNTRIES
            .iter()
            .copied()
            .filter(|c| !same_name(c, current))
            .collect();
        self.dice
            .pick(&options)
            .map(|c| c.to_string())
            .unwrap_or_else(|| self.start_country.clone())
    }

    /// Candidate towns from the generator; any failure yields an empty list
    async fn generate_candidates(&self, country: &str, count: usize, history: &[Location]) -> Vec<NewLocation> {
        debug!(%country, count, "generate_candidates: called");
        let excluded: Vec<&str> = history
            .iter()
            .filter(|l| same_name(&l.country, country))
            .map(|l| l.name.as_str())
            .collect();
        let context = json!({
            "count": count,
            "country": country,
            "excluded": excluded.join(", "),
        });

        let prompt = match self.prompts.render("cities", &context) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(error = %e, "Failed to render cities prompt");
                return Vec::new();
            }
        };
        let text = match generate(self.llm.as_ref(), &prompt, GenerationOptions::structured(STRUCTURED_MAX_TOKENS)).await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(%country, error = %e, "Candidate generation failed");
                return Vec::new();
            }
        };

        let outcome = parse_json_list::<CityCandidate>(&text);
        if outcome.is_malformed() {
            warn!(%country, "Candidate list was not valid JSON");
        }

        let mut locations = Vec::new();
        for candidate in outcome.into_list() {
            if let Some(location) = self.resolve_candidate(candidate, country).await {
                locations.push(location);
            }
        }
        debug!(%country, usable = locations.len(), "generate_candidates: resolved");
        locations
    }

    /// Complete a candidate with coordinates and locale; None when it has no usable position
    async fn resolve_candidate(&self, candidate: CityCandidate, country: &str) -> Option<NewLocation> {
        let name = candidate.name.trim().to_string();
        if name.is_empty() {
            return None;
        }

        let coordinates = match candidate.coordinates.filter(|c| c.is_valid() && !c.is_unset()) {
            Some(c) => c,
            None => {
                let geocoder = self.geocoder.as_ref()?;
                match geocoder.locate(&name, country).await {
                    Some(c) => c,
                    None => {
                        debug!(%name, "resolve_candidate: no coordinates, dropping");
                        return None;
                    }
                }
            }
        };

        Some(NewLocation {
            name,
            country: country.to_string(),
            region: candidate.region.map(|r| r.trim().to_string()).unwrap_or_default(),
            coordinates,
            locale: locale_for(country),
        })
    }

    fn pick(&self, mut locations: Vec<NewLocation>) -> Option<NewLocation> {
        let index = self.dice.index(locations.len())?;
        Some(locations.swap_remove(index))
    }

    fn fall_back(&self, country: &str, history: &[Location]) -> PlannedCity {
        let own: Vec<&BackupTown> = backups_for(country)
            .into_iter()
            .filter(|t| !visited(history, t.name, t.country))
            .collect();
        if let Some(town) = self.dice.pick(&own) {
            info!(town = town.name, %country, "Using backup town");
            return planned(town.to_new_location(), PlanSource::Backup);
        }

        let mut others: Vec<&str> = PRIORITY_COUNTRIES
            .iter()
            .copied()
            .filter(|c| !same_name(c, country))
            .collect();
        self.dice.shuffle(&mut others);
        for other in others {
            let towns: Vec<&BackupTown> = backups_for(other)
                .into_iter()
                .filter(|t| !visited(history, t.name, t.country))
                .collect();
            if let Some(town) = self.dice.pick(&towns) {
                info!(town = town.name, country = other, "Backups exhausted for {}, using another country", country);
                return planned(town.to_new_location(), PlanSource::OtherCountryBackup);
            }
        }

        warn!(%country, "Every backup town visited, synthesizing a location");
        planned(self.synthesize(country, history), PlanSource::Synthetic)
    }

    /// A nearby, never-visited variant of a backup town
    fn synthesize(&self, country: &str, history: &[Location]) -> NewLocation {
        let own = backups_for(country);
        let base: &BackupTown = if own.is_empty() {
            self.dice.pick(BACKUP_TOWNS).unwrap_or(&BACKUP_TOWNS[0])
        } else {
            self.dice.pick(&own).copied().unwrap_or(own[0])
        };

        let mut k = 1;
        let name = loop {
            let candidate = format!("{} (Environs {})", base.name, k);
            if !visited(history, &candidate, base.country) {
                break candidate;
            }
            k += 1;
        };

        let coordinates = Coordinates::new(
            (base.lat + self.dice.offset(SYNTHETIC_OFFSET_DEG)).clamp(-90.0, 90.0),
            (base.lng + self.dice.offset(SYNTHETIC_OFFSET_DEG)).clamp(-180.0, 180.0),
        );
        let mut location = base.to_new_location();
        location.name = name;
        location.coordinates = coordinates;
        location
    }
}

fn planned(location: NewLocation, source: PlanSource) -> PlannedCity {
    info!(name = %location.name, country = %location.country, ?source, "Next destination chosen");
    PlannedCity { location, source }
}

fn visited(history: &[Location], name: &str, country: &str) -> bool {
    history.iter().any(|l| l.same_place(name, country))
}

/// Drop candidates already in the history and repeats within the list
pub fn filter_unvisited(candidates: Vec<NewLocation>, history: &[Location]) -> Vec<NewLocation> {
    let mut kept: Vec<NewLocation> = Vec::new();
    for candidate in candidates {
        let repeat = kept
            .iter()
            .any(|k| same_name(&k.name, &candidate.name) && same_name(&k.country, &candidate.country));
        if repeat || visited(history, &candidate.name, &candidate.country) {
            debug!(name = %candidate.name, "filter_unvisited: dropping");
            continue;
        }
        kept.push(candidate);
    }
    kept
}

/// Distinct countries of the most recent locations, newest first
fn recent_countries(history: &[Location]) -> Vec<String> {
    let mut ordered: Vec<&Location> = history.iter().collect();
    ordered.sort_by(|a, b| b.order_in_journey.cmp(&a.order_in_journey));

    let mut recent: Vec<String> = Vec::new();
    for location in ordered {
        if !recent.iter().any(|c| same_name(c, &location.country)) {
            recent.push(location.country.clone());
        }
        if recent.len() == RECENT_COUNTRIES {
            break;
        }
    }
    recent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockLlmClient;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use placestore::Locale;

    fn history_entry(order: u32, name: &str, country: &str) -> Location {
        Location {
            id: order as i64,
            name: name.to_string(),
            country: country.to_string(),
            region: String::new(),
            coordinates: Coordinates::new(45.0, 19.0),
            locale: Locale {
                timezone: "Europe/Belgrade".to_string(),
                currency: "RSD".to_string(),
                language: "Serbian".to_string(),
            },
            is_current: false,
            is_visited: true,
            planned_arrival: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            planned_duration: 7,
            current_day: 7,
            order_in_journey: order,
            created_at: 0,
        }
    }

    fn planner(llm: Arc<MockLlmClient>, seed: u64) -> Planner {
        Planner::new(
            llm,
            Arc::new(PromptLoader::embedded_only()),
            None,
            Arc::new(Dice::seeded(seed)),
            "Serbia",
            5,
        )
    }

    const TWO_TOWNS: &str = r#"[
        {"name": "Kikinda", "region": "North Banat", "population": 38000, "coordinates": {"lat": 45.83, "lng": 20.46}},
        {"name": "Vršac", "region": "South Banat", "population": 35000, "coordinates": {"lat": 45.12, "lng": 21.30}}
    ]"#;

    #[tokio::test]
    async fn test_journey_start_uses_start_country() {
        let llm = Arc::new(MockLlmClient::texts(&[TWO_TOWNS]));
        let planned = planner(llm.clone(), 1).select_next_city(None, &[]).await;

        assert_eq!(planned.source, PlanSource::Generated);
        assert_eq!(planned.location.country, "Serbia");
        assert!(["Kikinda", "Vršac"].contains(&planned.location.name.as_str()));
        assert_eq!(planned.location.locale.currency, "RSD");
        // No country call at journey start
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_visited_candidates_filtered_case_insensitively() {
        let history = vec![history_entry(1, "KIKINDA", "serbia")];
        for seed in 0..5 {
            let llm = Arc::new(MockLlmClient::texts(&[TWO_TOWNS]));
            let planned = planner(llm, seed).select_next_city(None, &history).await;
            assert_eq!(planned.location.name, "Vršac");
        }
    }

    #[test]
    fn test_filter_folds_non_ascii_case() {
        let mut current = history_entry(1, "ČAČAK", "Serbia");
        current.is_current = true;
        let candidate = |name: &str| NewLocation {
            name: name.to_string(),
            country: "SERBIA".to_string(),
            region: String::new(),
            coordinates: Coordinates::new(43.89, 20.35),
            locale: locale_for("Serbia"),
        };

        let kept = filter_unvisited(vec![candidate("čačak"), candidate(" Čačak ")], &[current.clone()]);
        assert!(kept.is_empty());

        let kept = filter_unvisited(vec![candidate("Užice"), candidate("UŽICE")], &[current]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "Užice");
    }

    #[tokio::test]
    async fn test_malformed_then_valid_retry() {
        let llm = Arc::new(MockLlmClient::texts(&[
            "Croatia",
            "Sorry, here are some towns: Motovun, Ston...",
            r#"```json
[{"name": "Hum", "region": "Istria", "coordinates": {"lat": 45.35, "lng": 14.05}}]
```"#,
        ]));
        let history = vec![history_entry(1, "Sremski Karlovci", "Serbia")];
        let planned = planner(llm.clone(), 3).select_next_city(Some("Serbia"), &history).await;

        assert_eq!(planned.source, PlanSource::Regenerated);
        assert_eq!(planned.location.name, "Hum");
        assert_eq!(planned.location.country, "Croatia");
        assert_eq!(llm.call_count(), 3);
        assert!(llm.prompts()[2].contains("Suggest 8 small towns in Croatia"));
    }

    #[tokio::test]
    async fn test_chatty_country_answer_names_origin_first() {
        let llm = Arc::new(MockLlmClient::texts(&[
            "From Serbia I'd go to Croatia for the coast.",
            r#"[{"name": "Ston", "region": "Dalmatia", "coordinates": {"lat": 42.84, "lng": 17.70}}]"#,
        ]));
        let history = vec![history_entry(1, "Sremski Karlovci", "Serbia")];
        let planned = planner(llm.clone(), 2).select_next_city(Some("Serbia"), &history).await;

        assert_eq!(planned.location.country, "Croatia");
        assert_eq!(planned.location.name, "Ston");
        assert!(llm.prompts()[1].contains("Croatia"));
    }

    #[tokio::test]
    async fn test_country_call_failure_picks_other_priority_country() {
        let llm = Arc::new(MockLlmClient::scripted(vec![
            Err("down".to_string()),
            Ok(crate::llm::CompletionResponse::text("[]")),
            Ok(crate::llm::CompletionResponse::text("[]")),
        ]));
        let history = vec![history_entry(1, "Golubac", "Serbia")];
        let planned = planner(llm, 11).select_next_city(Some("Serbia"), &history).await;

        assert_ne!(planned.location.country, "Serbia");
        assert!(PRIORITY_COUNTRIES.contains(&planned.location.country.as_str()));
        assert_eq!(planned.source, PlanSource::Backup);
    }

    #[tokio::test]
    async fn test_exhausted_country_backups_move_to_other_country() {
        let history: Vec<Location> = backups_for("Serbia")
            .iter()
            .enumerate()
            .map(|(i, t)| history_entry(i as u32 + 1, t.name, t.country))
            .collect();
        let llm = Arc::new(MockLlmClient::texts(&["nonsense", "still nonsense"]));
        let planned = planner(llm, 5).select_next_city(None, &history).await;

        assert_eq!(planned.source, PlanSource::OtherCountryBackup);
        assert_ne!(planned.location.country, "Serbia");
        assert!(!history.iter().any(|l| l.same_place(&planned.location.name, &planned.location.country)));
    }

    #[tokio::test]
    async fn test_everything_exhausted_synthesizes() {
        let history: Vec<Location> = BACKUP_TOWNS
            .iter()
            .enumerate()
            .map(|(i, t)| history_entry(i as u32 + 1, t.name, t.country))
            .collect();
        let llm = Arc::new(MockLlmClient::texts(&["[]", "[]"]));
        let planned = planner(llm, 9).select_next_city(None, &history).await;

        assert_eq!(planned.source, PlanSource::Synthetic);
        assert_eq!(planned.location.country, "Serbia");
        assert!(planned.location.name.ends_with("(Environs 1)"));
        let base = backups_for("Serbia")
            .into_iter()
            .find(|t| planned.location.name.starts_with(t.name))
            .unwrap();
        assert!((planned.location.coordinates.lat - base.lat).abs() <= SYNTHETIC_OFFSET_DEG);
        assert!((planned.location.coordinates.lng - base.lng).abs() <= SYNTHETIC_OFFSET_DEG);
    }

    struct FixedGeocoder;

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn locate(&self, name: &str, _country: &str) -> Option<Coordinates> {
            (name == "Hum").then(|| Coordinates::new(45.35, 14.05))
        }
    }

    #[tokio::test]
    async fn test_geocoder_fills_missing_coordinates() {
        let llm = Arc::new(MockLlmClient::texts(&[r#"[{"name": "Hum"}, {"name": "Nowhere"}]"#]));
        let planner = Planner::new(
            llm,
            Arc::new(PromptLoader::embedded_only()),
            Some(Arc::new(FixedGeocoder)),
            Arc::new(Dice::seeded(2)),
            "Croatia",
            5,
        );
        let planned = planner.select_next_city(None, &[]).await;
        assert_eq!(planned.location.name, "Hum");
        assert_eq!(planned.source, PlanSource::Generated);
    }

    #[test]
    fn test_recent_countries() {
        let history = vec![
            history_entry(1, "A", "Serbia"),
            history_entry(2, "B", "Croatia"),
            history_entry(3, "C", "Croatia"),
            history_entry(4, "D", "Slovenia"),
            history_entry(5, "E", "Italy"),
        ];
        assert_eq!(recent_countries(&history), vec!["Italy", "Slovenia", "Croatia"]);
    }
}
