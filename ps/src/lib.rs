//! PlaceStore - persistent journey state for nomadpost
//!
//! A single SQLite database holding the itinerary and everything the daily
//! content cycle needs to remember between runs.
//!
//! # Tables
//!
//! ```text
//! locations             # itinerary nodes, exactly one is_current = 1
//! points_of_interest    # attractions and restaurants per location
//! visits                # (poi, date) consumption ledger
//! transportation_legs   # one directed edge per move
//! used_content          # fingerprints of externally sourced assets
//! settings              # runtime tunables (key/value)
//! posts                 # publication log
//! ```
//!
//! Every operation that touches more than one row runs inside a transaction, so
//! a failure partway through a move leaves the previous location current.

mod lock;
mod models;
mod schema;
mod store;

pub use lock::StoreLock;
pub use models::{
    Coordinates, Locale, Location, LocationId, NewLeg, NewLocation, NewPoi, NewPost, OpeningHours, Poi, PoiId,
    PoiKind, PostKind, PostRecord, Setting, TransportLeg, TransportMode, UsedContent, Visit, same_name,
};
pub use store::{DB_FILE_NAME, Store};

/// Current time as Unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
