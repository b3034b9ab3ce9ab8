//! State manager messages
//!
//! Commands and responses for the actor pattern.

use chrono::NaiveDate;
use placestore::{
    Location, LocationId, NewLeg, NewLocation, NewPoi, NewPost, Poi, PoiId, PoiKind, PostRecord, Setting,
    TransportLeg,
};
use thiserror::Error;
use tokio::sync::oneshot;

/// Errors from state operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Channel error")]
    ChannelError,
}

impl From<eyre::Report> for StateError {
    fn from(e: eyre::Report) -> Self {
        StateError::StoreError(format!("{:#}", e))
    }
}

/// Response from state operations
pub type StateResponse<T> = Result<T, StateError>;

/// Commands sent to the StateManager actor
#[derive(Debug)]
pub enum StateCommand {
    // Location operations
    CurrentLocation {
        reply: oneshot::Sender<StateResponse<Option<Location>>>,
    },
    GetLocation {
        id: LocationId,
        reply: oneshot::Sender<StateResponse<Option<Location>>>,
    },
    ListLocations {
        reply: oneshot::Sender<StateResponse<Vec<Location>>>,
    },
    StartJourney {
        first: NewLocation,
        arrival: NaiveDate,
        planned_duration: u32,
        reply: oneshot::Sender<StateResponse<Location>>,
    },
    Relocate {
        from_id: LocationId,
        next: NewLocation,
        arrival: NaiveDate,
        planned_duration: u32,
        leg: NewLeg,
        reply: oneshot::Sender<StateResponse<(Location, TransportLeg)>>,
    },

    // POI operations
    InsertPois {
        location_id: LocationId,
        pois: Vec<NewPoi>,
        reply: oneshot::Sender<StateResponse<Vec<Poi>>>,
    },
    ListPois {
        location_id: LocationId,
        kind: PoiKind,
        reply: oneshot::Sender<StateResponse<Vec<Poi>>>,
    },
    AvailablePois {
        location_id: LocationId,
        kind: PoiKind,
        reply: oneshot::Sender<StateResponse<Vec<Poi>>>,
    },
    CountAvailable {
        location_id: LocationId,
        kind: PoiKind,
        reply: oneshot::Sender<StateResponse<u32>>,
    },
    IsConsumed {
        poi_id: PoiId,
        reply: oneshot::Sender<StateResponse<bool>>,
    },
    CompleteDailyPost {
        poi_ids: Vec<PoiId>,
        date: NaiveDate,
        post: NewPost,
        reply: oneshot::Sender<StateResponse<PostRecord>>,
    },

    // Leg operations
    LegInto {
        to_id: LocationId,
        reply: oneshot::Sender<StateResponse<Option<TransportLeg>>>,
    },
    ListLegs {
        reply: oneshot::Sender<StateResponse<Vec<TransportLeg>>>,
    },

    // Dedup ledger
    HasFingerprint {
        fingerprint: String,
        reply: oneshot::Sender<StateResponse<bool>>,
    },
    RecordFingerprint {
        fingerprint: String,
        source: String,
        kind: String,
        reply: oneshot::Sender<StateResponse<bool>>,
    },

    // Settings
    GetSetting {
        key: String,
        reply: oneshot::Sender<StateResponse<Option<String>>>,
    },
    SetSetting {
        key: String,
        value: String,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    DeleteSetting {
        key: String,
        reply: oneshot::Sender<StateResponse<bool>>,
    },
    ListSettings {
        reply: oneshot::Sender<StateResponse<Vec<Setting>>>,
    },

    // Publication log
    RecordPost {
        post: NewPost,
        reply: oneshot::Sender<StateResponse<PostRecord>>,
    },
    ListPosts {
        limit: usize,
        reply: oneshot::Sender<StateResponse<Vec<PostRecord>>>,
    },

    // Shutdown
    Shutdown,
}
