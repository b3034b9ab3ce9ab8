//! Place selection and POI lifecycle
//!
//! Points of interest are generated lazily per location and kind. A POI stays
//! available until a published daily post includes it; once every POI of a
//! kind is consumed the next selection generates a fresh batch.

mod hours;
mod selector;

pub use hours::{hours_for, is_weekend, line_is_open, open_yesterday};
pub use selector::{DailySelection, PlaceSelector, default_poi};
