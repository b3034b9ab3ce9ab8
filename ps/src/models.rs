//! Record types stored in the place database

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Row id of a location
pub type LocationId = i64;

/// Row id of a point of interest
pub type PoiId = i64;

/// Geographic coordinates in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "lon", alias = "longitude")]
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// (0, 0) is what generators emit when they have nothing better
    pub fn is_unset(&self) -> bool {
        self.lat == 0.0 && self.lng == 0.0
    }

    /// Latitude within [-90, 90] and longitude within [-180, 180]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Locale metadata attached to every location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locale {
    pub timezone: String,
    pub currency: String,
    pub language: String,
}

/// Location descriptor produced by the itinerary planner before it is persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLocation {
    pub name: String,
    pub country: String,
    pub region: String,
    pub coordinates: Coordinates,
    pub locale: Locale,
}

/// A town on the itinerary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub country: String,
    pub region: String,
    pub coordinates: Coordinates,
    pub locale: Locale,
    /// Exactly one location carries this flag once the journey has started
    pub is_current: bool,
    /// Set when the persona leaves the location
    pub is_visited: bool,
    pub planned_arrival: NaiveDate,
    /// Planned stay in days
    pub planned_duration: u32,
    /// 1-indexed day counter, advanced after each daily post
    pub current_day: u32,
    /// Position in the itinerary, contiguous from 1
    pub order_in_journey: u32,
    pub created_at: i64,
}

/// Trimmed, Unicode case-insensitive name equality ("ČAČAK" matches "čačak")
pub fn same_name(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    a == b || a.to_lowercase() == b.to_lowercase()
}

impl Location {
    /// Case-insensitive (name, country) identity used for repeat detection
    pub fn same_place(&self, name: &str, country: &str) -> bool {
        same_name(&self.name, name) && same_name(&self.country, country)
    }
}

/// Kind of point of interest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoiKind {
    Attraction,
    Restaurant,
}

impl PoiKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attraction => "attraction",
            Self::Restaurant => "restaurant",
        }
    }
}

impl std::fmt::Display for PoiKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PoiKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "attraction" => Ok(Self::Attraction),
            "restaurant" => Ok(Self::Restaurant),
            _ => Err(format!("Unknown point of interest kind: {}", s)),
        }
    }
}

/// Free-text opening hours, split by weekday and weekend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningHours {
    #[serde(default)]
    pub weekday: Option<String>,
    #[serde(default)]
    pub weekend: Option<String>,
}

impl OpeningHours {
    /// Hours used for places synthesized without any source data
    pub fn always_open() -> Self {
        Self {
            weekday: Some("00:00-23:59".to_string()),
            weekend: Some("00:00-23:59".to_string()),
        }
    }
}

/// Point of interest before it is persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPoi {
    pub kind: PoiKind,
    pub name: String,
    pub description: String,
    pub opening_hours: OpeningHours,
    pub website: Option<String>,
}

/// An attraction or restaurant belonging to one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poi {
    pub id: PoiId,
    pub location_id: LocationId,
    pub kind: PoiKind,
    pub name: String,
    pub description: String,
    pub opening_hours: OpeningHours,
    pub website: Option<String>,
    pub created_at: i64,
}

/// A POI linked to a calendar date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub id: i64,
    pub poi_id: PoiId,
    pub visit_date: NaiveDate,
    /// Set once the visit has been used in published content
    pub included_in_post: bool,
}

/// How the persona travels between two locations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Bus,
    Train,
    Airplane,
}

impl TransportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bus => "bus",
            Self::Train => "train",
            Self::Airplane => "airplane",
        }
    }
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bus" => Ok(Self::Bus),
            "train" => Ok(Self::Train),
            "airplane" | "plane" => Ok(Self::Airplane),
            _ => Err(format!("Unknown transport mode: {}", s)),
        }
    }
}

/// Transport details computed at move time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLeg {
    pub mode: TransportMode,
    pub departure_at: NaiveDateTime,
    pub arrival_at: NaiveDateTime,
    pub distance_km: f64,
    pub duration_minutes: u32,
    pub price_eur: f64,
}

/// A directed edge between two locations, created once per move
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportLeg {
    pub id: i64,
    pub from_location_id: LocationId,
    pub to_location_id: LocationId,
    pub mode: TransportMode,
    pub departure_at: NaiveDateTime,
    pub arrival_at: NaiveDateTime,
    pub distance_km: f64,
    pub duration_minutes: u32,
    pub price_eur: f64,
    pub created_at: i64,
}

/// Dedup ledger entry for an externally sourced asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsedContent {
    pub fingerprint: String,
    /// Provider or generator the asset came from
    pub source: String,
    /// Asset kind, e.g. "image"
    pub kind: String,
    pub created_at: i64,
}

/// Runtime tunable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub updated_at: i64,
}

/// Which template produced a published post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Daily,
    Travel,
}

impl PostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Travel => "travel",
        }
    }
}

impl std::fmt::Display for PostKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PostKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "travel" => Ok(Self::Travel),
            _ => Err(format!("Unknown post kind: {}", s)),
        }
    }
}

/// Publication log entry before it is persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPost {
    pub kind: PostKind,
    pub location_id: LocationId,
    pub post_date: NaiveDate,
    /// Identifier returned by the publication gateway
    pub remote_id: String,
    pub url: String,
    pub title: String,
    pub tags: Vec<String>,
}

/// A published post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: i64,
    pub kind: PostKind,
    pub location_id: LocationId,
    pub post_date: NaiveDate,
    pub remote_id: String,
    pub url: String,
    pub title: String,
    pub tags: Vec<String>,
    pub created_at: i64,
}
