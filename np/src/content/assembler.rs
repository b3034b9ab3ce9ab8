//! Turns selected places and journey legs into publishable documents

use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::join_all;
use placestore::{Location, Poi, TransportLeg};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::document::{ContentKind, Document, DocumentImage};
use crate::dedup::ImageSourcer;
use crate::llm::{GenerationOptions, LlmClient, LlmError, generate};
use crate::prompts::PromptLoader;
use crate::providers::{ImageRef, WeatherProvider};

/// Errors while assembling a document
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("Generation failed: {0}")]
    Generation(#[from] LlmError),
}

/// Inputs for a daily post
#[derive(Debug, Clone, Copy)]
pub struct DailyContext<'a> {
    pub location: &'a Location,
    pub date: NaiveDate,
    pub attraction: &'a Poi,
    pub restaurant: &'a Poi,
}

/// Inputs for a travel post
#[derive(Debug, Clone, Copy)]
pub struct TravelContext<'a> {
    pub from: &'a Location,
    pub to: &'a Location,
    pub leg: &'a TransportLeg,
    pub date: NaiveDate,
}

/// Builds documents from templates, generated prose and sourced images
pub struct ContentAssembler {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    images: ImageSourcer,
    weather: Option<Arc<dyn WeatherProvider>>,
    images_per_post: usize,
    max_tokens: u32,
}

impl ContentAssembler {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        prompts: Arc<PromptLoader>,
        images: ImageSourcer,
        weather: Option<Arc<dyn WeatherProvider>>,
        images_per_post: usize,
        max_tokens: u32,
    ) -> Self {
        Self {
            llm,
            prompts,
            images,
            weather,
            images_per_post,
            max_tokens,
        }
    }

    /// Write the post for a day spent at the current location
    pub async fn daily(&self, ctx: DailyContext<'_>) -> Result<Document, ContentError> {
        let location = ctx.location;
        debug!(city = %location.name, day = location.current_day, "ContentAssembler::daily: called");

        let weather = self.weather_summary(location).await;
        let prompt = self
            .prompts
            .render(
                ContentKind::Daily.template(),
                &json!({
                    "day": location.current_day,
                    "city": location.name,
                    "region": location.region,
                    "country": location.country,
                    "date": ctx.date.format("%A, %-d %B %Y").to_string(),
                    "weather": weather,
                    "attraction": { "name": ctx.attraction.name, "description": ctx.attraction.description },
                    "restaurant": { "name": ctx.restaurant.name, "description": ctx.restaurant.description },
                    "language": location.locale.language,
                    "currency": location.locale.currency,
                }),
            )
            .map_err(|e| ContentError::Prompt(e.to_string()))?;

        let text = generate(self.llm.as_ref(), &prompt, GenerationOptions::prose(self.max_tokens)).await?;

        let queries = vec![
            format!("{} {}", ctx.attraction.name, location.name),
            format!("{} {}", location.name, location.country),
        ];
        let images = self.collect_images(&queries).await;

        let tags = vec![
            location.name.clone(),
            location.country.clone(),
            ContentKind::Daily.to_string(),
            ctx.attraction.name.clone(),
            ctx.restaurant.name.clone(),
        ];
        let fallback_title = format!("Day {} in {}", location.current_day, location.name);
        let doc = Document::from_generated(ContentKind::Daily, ctx.date, &text, &fallback_title, tags, images);
        info!(title = %doc.title, images = doc.images.len(), "Daily document assembled");
        Ok(doc)
    }

    /// Write the post describing a move between two locations
    pub async fn travel(&self, ctx: TravelContext<'_>) -> Result<Document, ContentError> {
        let (from, to, leg) = (ctx.from, ctx.to, ctx.leg);
        debug!(from = %from.name, to = %to.name, mode = %leg.mode, "ContentAssembler::travel: called");

        let weather = self.weather_summary(to).await;
        let prompt = self
            .prompts
            .render(
                ContentKind::Travel.template(),
                &json!({
                    "days_stayed": from.current_day.saturating_sub(1).max(1),
                    "from": { "name": from.name, "country": from.country },
                    "to": { "name": to.name, "region": to.region, "country": to.country },
                    "date": ctx.date.format("%A, %-d %B %Y").to_string(),
                    "leg": {
                        "mode": leg.mode.as_str(),
                        "distance_km": format!("{:.0}", leg.distance_km),
                        "departure": leg.departure_at.format("%H:%M").to_string(),
                        "arrival": leg.arrival_at.format("%H:%M").to_string(),
                        "duration": format_duration(leg.duration_minutes),
                        "price_eur": format!("{:.2}", leg.price_eur),
                    },
                    "weather": weather,
                }),
            )
            .map_err(|e| ContentError::Prompt(e.to_string()))?;

        let text = generate(self.llm.as_ref(), &prompt, GenerationOptions::prose(self.max_tokens)).await?;

        let queries = vec![
            format!("{} {}", to.name, to.country),
            format!("{} {}", leg.mode.as_str(), to.country),
        ];
        let images = self.collect_images(&queries).await;

        let tags = vec![
            to.name.clone(),
            to.country.clone(),
            ContentKind::Travel.to_string(),
            from.name.clone(),
            leg.mode.to_string(),
        ];
        let fallback_title = format!("From {} to {}", from.name, to.name);
        let doc = Document::from_generated(ContentKind::Travel, ctx.date, &text, &fallback_title, tags, images);
        info!(title = %doc.title, images = doc.images.len(), "Travel document assembled");
        Ok(doc)
    }

    async fn weather_summary(&self, location: &Location) -> Option<String> {
        let provider = self.weather.as_ref()?;
        let report = provider.current(location.coordinates).await;
        debug!(city = %location.name, found = report.is_some(), "weather_summary: looked up");
        report.map(|r| r.summary())
    }

    /// Source one image per query through the ledger, then fetch the binaries concurrently
    ///
    /// Lookups run in order so two queries in one post never claim the same
    /// fresh image. A failed download drops that image.
    async fn collect_images(&self, queries: &[String]) -> Vec<DocumentImage> {
        let mut refs: Vec<ImageRef> = Vec::new();
        for query in queries.iter().take(self.images_per_post) {
            if let Some(image) = self.images.find(query).await
                && !refs.iter().any(|r| r.fingerprint() == image.fingerprint())
            {
                refs.push(image);
            }
        }

        let provider = self.images.provider();
        let downloads = join_all(refs.iter().map(|image| provider.fetch(image))).await;

        refs.into_iter()
            .zip(downloads)
            .filter_map(|(image, result)| match result {
                Ok(bytes) => Some(DocumentImage { image, bytes }),
                Err(e) => {
                    warn!(url = %image.url, error = %e, "Image download failed, dropping image");
                    None
                }
            })
            .collect()
    }
}

fn format_duration(minutes: u32) -> String {
    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{} min", m),
        (h, 0) => format!("{} h", h),
        (h, m) => format!("{} h {} min", h, m),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockLlmClient;
    use crate::providers::images::fake::{FakeImageProvider, image};
    use crate::state::StateManager;
    use chrono::{NaiveDateTime, NaiveTime};
    use placestore::{Coordinates, Locale, OpeningHours, PoiKind, TransportMode};

    fn location(id: i64, name: &str, day: u32) -> Location {
        Location {
            id,
            name: name.to_string(),
            country: "Croatia".to_string(),
            region: "Istria".to_string(),
            coordinates: Coordinates::new(45.08, 13.64),
            locale: Locale {
                timezone: "Europe/Zagreb".to_string(),
                currency: "EUR".to_string(),
                language: "Croatian".to_string(),
            },
            is_current: true,
            is_visited: false,
            planned_arrival: date(),
            planned_duration: 10,
            current_day: day,
            order_in_journey: id as u32,
            created_at: 0,
        }
    }

    fn poi(id: i64, kind: PoiKind, name: &str) -> Poi {
        Poi {
            id,
            location_id: 1,
            kind,
            name: name.to_string(),
            description: format!("About {}", name),
            opening_hours: OpeningHours::always_open(),
            website: None,
            created_at: 0,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    fn assembler(llm: Arc<MockLlmClient>, provider: FakeImageProvider) -> ContentAssembler {
        let state = StateManager::spawn_in_memory().unwrap();
        ContentAssembler::new(
            llm,
            Arc::new(PromptLoader::embedded_only()),
            ImageSourcer::new(Arc::new(provider), state),
            None,
            2,
            1024,
        )
    }

    #[tokio::test]
    async fn test_daily_document() {
        let llm = Arc::new(MockLlmClient::texts(&["Stone Streets of Rovinj\n\nI woke to bells."]));
        let assembler = assembler(llm.clone(), FakeImageProvider::endless("unsplash"));

        let loc = location(1, "Rovinj", 3);
        let attraction = poi(1, PoiKind::Attraction, "Church of St. Euphemia");
        let restaurant = poi(2, PoiKind::Restaurant, "Konoba Veli Jože");
        let doc = assembler
            .daily(DailyContext {
                location: &loc,
                date: date(),
                attraction: &attraction,
                restaurant: &restaurant,
            })
            .await
            .unwrap();

        assert_eq!(doc.kind, ContentKind::Daily);
        assert_eq!(doc.title, "Stone Streets of Rovinj");
        assert_eq!(doc.images.len(), 2);
        assert_ne!(doc.images[0].image.fingerprint(), doc.images[1].image.fingerprint());
        assert!(doc.tags.contains(&"Church of St. Euphemia".to_string()));

        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("day 3 of your stay in Rovinj"));
        assert!(prompt.contains("Konoba Veli Jože"));
        assert!(!prompt.contains("The weather today"));
    }

    #[tokio::test]
    async fn test_travel_document() {
        let llm = Arc::new(MockLlmClient::texts(&["Onward to Motovun\n\nThe bus was late."]));
        let assembler = assembler(llm.clone(), FakeImageProvider::new("pexels", vec![None]));

        let from = location(1, "Rovinj", 9);
        let to = location(2, "Motovun", 1);
        let departure_at = NaiveDateTime::new(date(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        let leg = TransportLeg {
            id: 1,
            from_location_id: 1,
            to_location_id: 2,
            mode: TransportMode::Bus,
            departure_at,
            arrival_at: departure_at + chrono::TimeDelta::minutes(75),
            distance_km: 45.3,
            duration_minutes: 75,
            price_eur: 8.62,
            created_at: 0,
        };

        let doc = assembler
            .travel(TravelContext {
                from: &from,
                to: &to,
                leg: &leg,
                date: date(),
            })
            .await
            .unwrap();

        assert_eq!(doc.kind, ContentKind::Travel);
        assert!(doc.images.is_empty());
        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("After 9 days in Rovinj"));
        assert!(prompt.contains("By bus, about 45 km"));
        assert!(prompt.contains("(1 h 15 min)"));
    }

    #[tokio::test]
    async fn test_generation_failure_surfaces() {
        let llm = Arc::new(MockLlmClient::scripted(vec![Err("boom".to_string())]));
        let assembler = assembler(llm, FakeImageProvider::endless("unsplash"));
        let loc = location(1, "Rovinj", 1);
        let a = poi(1, PoiKind::Attraction, "A");
        let r = poi(2, PoiKind::Restaurant, "R");
        let result = assembler
            .daily(DailyContext {
                location: &loc,
                date: date(),
                attraction: &a,
                restaurant: &r,
            })
            .await;
        assert!(matches!(result, Err(ContentError::Generation(_))));
    }

    #[tokio::test]
    async fn test_broken_download_dropped() {
        let mut broken = image("unsplash", "b1");
        broken.url = "https://img.example/broken.jpg".to_string();
        let provider = FakeImageProvider::new("unsplash", vec![Some(broken)]);
        let llm = Arc::new(MockLlmClient::texts(&["T\n\nB"]));
        let assembler = assembler(llm, provider);
        let images = assembler.collect_images(&["q".to_string()]).await;
        assert!(images.is_empty());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(45), "45 min");
        assert_eq!(format_duration(120), "2 h");
        assert_eq!(format_duration(75), "1 h 15 min");
    }
}
