//! Itinerary planning: where the persona goes next

mod catalog;
mod itinerary;

pub use catalog::{
    BACKUP_TOWNS, BackupTown, PRIORITY_COUNTRIES, SECONDARY_COUNTRIES, backups_for, default_locale, known_countries,
    locale_for, resolve_country,
};
pub use itinerary::{PlanSource, PlannedCity, Planner, RETRY_FACTOR, SYNTHETIC_OFFSET_DEG, filter_unvisited};
