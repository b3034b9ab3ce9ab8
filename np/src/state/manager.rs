//! StateManager - actor that owns the PlaceStore
//!
//! Processes commands via channels so the cycle, the scheduler loop and the CLI
//! share one connection without locking.

use std::path::Path;

use chrono::NaiveDate;
use placestore::{
    Location, LocationId, NewLeg, NewLocation, NewPoi, NewPost, Poi, PoiId, PoiKind, PostRecord, Setting, Store,
    TransportLeg,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::messages::{StateCommand, StateError, StateResponse};

/// Handle to send commands to the StateManager
#[derive(Clone)]
pub struct StateManager {
    tx: mpsc::Sender<StateCommand>,
}

impl StateManager {
    /// Spawn a new StateManager actor over the store in `store_path`
    pub fn spawn(store_path: impl AsRef<Path>) -> eyre::Result<Self> {
        debug!(store_path = %store_path.as_ref().display(), "spawn: called");
        let store = Store::open(store_path.as_ref())?;
        Ok(Self::spawn_with(store))
    }

    /// Spawn over an in-memory store
    pub fn spawn_in_memory() -> eyre::Result<Self> {
        debug!("spawn_in_memory: called");
        Ok(Self::spawn_with(Store::open_in_memory()?))
    }

    fn spawn_with(store: Store) -> Self {
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(actor_loop(store, rx));
        info!("StateManager spawned");
        Self { tx }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<StateResponse<T>>) -> StateCommand,
    ) -> StateResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(command(reply_tx))
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    // === Location operations ===

    /// The location the persona is in, if the journey has started
    pub async fn current_location(&self) -> StateResponse<Option<Location>> {
        debug!("current_location: called");
        self.request(|reply| StateCommand::CurrentLocation { reply }).await
    }

    /// The current location, returning error if there is none
    pub async fn current_location_required(&self) -> StateResponse<Location> {
        debug!("current_location_required: called");
        self.current_location()
            .await?
            .ok_or_else(|| StateError::NotFound("current location".to_string()))
    }

    pub async fn get_location(&self, id: LocationId) -> StateResponse<Option<Location>> {
        debug!(id, "get_location: called");
        self.request(|reply| StateCommand::GetLocation { id, reply }).await
    }

    /// Every location in journey order
    pub async fn list_locations(&self) -> StateResponse<Vec<Location>> {
        debug!("list_locations: called");
        self.request(|reply| StateCommand::ListLocations { reply }).await
    }

    /// Insert the first location as current
    pub async fn start_journey(
        &self,
        first: NewLocation,
        arrival: NaiveDate,
        planned_duration: u32,
    ) -> StateResponse<Location> {
        debug!(name = %first.name, %arrival, planned_duration, "start_journey: called");
        self.request(|reply| StateCommand::StartJourney {
            first,
            arrival,
            planned_duration,
            reply,
        })
        .await
    }

    /// Atomic move: flag flips, new location and leg in one transaction
    pub async fn relocate(
        &self,
        from_id: LocationId,
        next: NewLocation,
        arrival: NaiveDate,
        planned_duration: u32,
        leg: NewLeg,
    ) -> StateResponse<(Location, TransportLeg)> {
        debug!(from_id, name = %next.name, "relocate: called");
        self.request(|reply| StateCommand::Relocate {
            from_id,
            next,
            arrival,
            planned_duration,
            leg,
            reply,
        })
        .await
    }

    // === POI operations ===

    pub async fn insert_pois(&self, location_id: LocationId, pois: Vec<NewPoi>) -> StateResponse<Vec<Poi>> {
        debug!(location_id, count = pois.len(), "insert_pois: called");
        self.request(|reply| StateCommand::InsertPois {
            location_id,
            pois,
            reply,
        })
        .await
    }

    pub async fn list_pois(&self, location_id: LocationId, kind: PoiKind) -> StateResponse<Vec<Poi>> {
        debug!(location_id, %kind, "list_pois: called");
        self.request(|reply| StateCommand::ListPois {
            location_id,
            kind,
            reply,
        })
        .await
    }

    /// POIs of a kind not yet included in a published post
    pub async fn available_pois(&self, location_id: LocationId, kind: PoiKind) -> StateResponse<Vec<Poi>> {
        debug!(location_id, %kind, "available_pois: called");
        self.request(|reply| StateCommand::AvailablePois {
            location_id,
            kind,
            reply,
        })
        .await
    }

    pub async fn count_available(&self, location_id: LocationId, kind: PoiKind) -> StateResponse<u32> {
        debug!(location_id, %kind, "count_available: called");
        self.request(|reply| StateCommand::CountAvailable {
            location_id,
            kind,
            reply,
        })
        .await
    }

    pub async fn is_consumed(&self, poi_id: PoiId) -> StateResponse<bool> {
        debug!(poi_id, "is_consumed: called");
        self.request(|reply| StateCommand::IsConsumed { poi_id, reply }).await
    }

    /// Mark featured POIs consumed, advance the day and log the post, atomically
    pub async fn complete_daily_post(
        &self,
        poi_ids: Vec<PoiId>,
        date: NaiveDate,
        post: NewPost,
    ) -> StateResponse<PostRecord> {
        debug!(?poi_ids, %date, "complete_daily_post: called");
        self.request(|reply| StateCommand::CompleteDailyPost {
            poi_ids,
            date,
            post,
            reply,
        })
        .await
    }

    // === Leg operations ===

    /// The leg that arrived at a location
    pub async fn leg_into(&self, to_id: LocationId) -> StateResponse<Option<TransportLeg>> {
        debug!(to_id, "leg_into: called");
        self.request(|reply| StateCommand::LegInto { to_id, reply }).await
    }

    pub async fn list_legs(&self) -> StateResponse<Vec<TransportLeg>> {
        debug!("list_legs: called");
        self.request(|reply| StateCommand::ListLegs { reply }).await
    }

    // === Dedup ledger ===

    pub async fn has_fingerprint(&self, fingerprint: &str) -> StateResponse<bool> {
        debug!(%fingerprint, "has_fingerprint: called");
        let fingerprint = fingerprint.to_string();
        self.request(|reply| StateCommand::HasFingerprint { fingerprint, reply })
            .await
    }

    /// Returns false if the fingerprint was already recorded
    pub async fn record_fingerprint(&self, fingerprint: &str, source: &str, kind: &str) -> StateResponse<bool> {
        debug!(%fingerprint, %source, %kind, "record_fingerprint: called");
        let (fingerprint, source, kind) = (fingerprint.to_string(), source.to_string(), kind.to_string());
        self.request(|reply| StateCommand::RecordFingerprint {
            fingerprint,
            source,
            kind,
            reply,
        })
        .await
    }

    // === Settings ===

    pub async fn get_setting(&self, key: &str) -> StateResponse<Option<String>> {
        debug!(%key, "get_setting: called");
        let key = key.to_string();
        self.request(|reply| StateCommand::GetSetting { key, reply }).await
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> StateResponse<()> {
        debug!(%key, %value, "set_setting: called");
        let (key, value) = (key.to_string(), value.to_string());
        self.request(|reply| StateCommand::SetSetting { key, value, reply })
            .await
    }

    pub async fn delete_setting(&self, key: &str) -> StateResponse<bool> {
        debug!(%key, "delete_setting: called");
        let key = key.to_string();
        self.request(|reply| StateCommand::DeleteSetting { key, reply }).await
    }

    pub async fn list_settings(&self) -> StateResponse<Vec<Setting>> {
        debug!("list_settings: called");
        self.request(|reply| StateCommand::ListSettings { reply }).await
    }

    // === Publication log ===

    pub async fn record_post(&self, post: NewPost) -> StateResponse<PostRecord> {
        debug!(kind = %post.kind, location_id = post.location_id, "record_post: called");
        self.request(|reply| StateCommand::RecordPost { post, reply }).await
    }

    /// Newest first
    pub async fn list_posts(&self, limit: usize) -> StateResponse<Vec<PostRecord>> {
        debug!(limit, "list_posts: called");
        self.request(|reply| StateCommand::ListPosts { limit, reply }).await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> Result<(), StateError> {
        debug!("shutdown: called");
        self.tx
            .send(StateCommand::Shutdown)
            .await
            .map_err(|_| StateError::ChannelError)
    }
}

/// The actor loop that processes commands
async fn actor_loop(mut store: Store, mut rx: mpsc::Receiver<StateCommand>) {
    debug!("actor_loop: called");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            StateCommand::CurrentLocation { reply } => {
                debug!("actor_loop: CurrentLocation command");
                let _ = reply.send(store.current_location().map_err(StateError::from));
            }

            StateCommand::GetLocation { id, reply } => {
                debug!(id, "actor_loop: GetLocation command");
                let _ = reply.send(store.get_location(id).map_err(StateError::from));
            }

            StateCommand::ListLocations { reply } => {
                debug!("actor_loop: ListLocations command");
                let _ = reply.send(store.list_locations().map_err(StateError::from));
            }

            StateCommand::StartJourney {
                first,
                arrival,
                planned_duration,
                reply,
            } => {
                debug!(name = %first.name, "actor_loop: StartJourney command");
                let result = store
                    .start_journey(&first, arrival, planned_duration)
                    .map_err(StateError::from);
                let _ = reply.send(result);
            }

            StateCommand::Relocate {
                from_id,
                next,
                arrival,
                planned_duration,
                leg,
                reply,
            } => {
                debug!(from_id, name = %next.name, "actor_loop: Relocate command");
                let result = store
                    .relocate(from_id, &next, arrival, planned_duration, &leg)
                    .map_err(StateError::from);
                let _ = reply.send(result);
            }

            StateCommand::InsertPois {
                location_id,
                pois,
                reply,
            } => {
                debug!(location_id, count = pois.len(), "actor_loop: InsertPois command");
                let _ = reply.send(store.insert_pois(location_id, &pois).map_err(StateError::from));
            }

            StateCommand::ListPois {
                location_id,
                kind,
                reply,
            } => {
                debug!(location_id, %kind, "actor_loop: ListPois command");
                let _ = reply.send(store.list_pois(location_id, kind).map_err(StateError::from));
            }

            StateCommand::AvailablePois {
                location_id,
                kind,
                reply,
            } => {
                debug!(location_id, %kind, "actor_loop: AvailablePois command");
                let _ = reply.send(store.available_pois(location_id, kind).map_err(StateError::from));
            }

            StateCommand::CountAvailable {
                location_id,
                kind,
                reply,
            } => {
                debug!(location_id, %kind, "actor_loop: CountAvailable command");
                let _ = reply.send(store.count_available(location_id, kind).map_err(StateError::from));
            }

            StateCommand::IsConsumed { poi_id, reply } => {
                debug!(poi_id, "actor_loop: IsConsumed command");
                let _ = reply.send(store.is_consumed(poi_id).map_err(StateError::from));
            }

            StateCommand::CompleteDailyPost {
                poi_ids,
                date,
                post,
                reply,
            } => {
                debug!(?poi_ids, %date, "actor_loop: CompleteDailyPost command");
                let result = store
                    .complete_daily_post(&poi_ids, date, &post)
                    .map_err(StateError::from);
                let _ = reply.send(result);
            }

            StateCommand::LegInto { to_id, reply } => {
                debug!(to_id, "actor_loop: LegInto command");
                let _ = reply.send(store.leg_into(to_id).map_err(StateError::from));
            }

            StateCommand::ListLegs { reply } => {
                debug!("actor_loop: ListLegs command");
                let _ = reply.send(store.list_legs().map_err(StateError::from));
            }

            StateCommand::HasFingerprint { fingerprint, reply } => {
                debug!(%fingerprint, "actor_loop: HasFingerprint command");
                let _ = reply.send(store.has_fingerprint(&fingerprint).map_err(StateError::from));
            }

            StateCommand::RecordFingerprint {
                fingerprint,
                source,
                kind,
                reply,
            } => {
                debug!(%fingerprint, "actor_loop: RecordFingerprint command");
                let result = store
                    .record_fingerprint(&fingerprint, &source, &kind)
                    .map_err(StateError::from);
                let _ = reply.send(result);
            }

            StateCommand::GetSetting { key, reply } => {
                debug!(%key, "actor_loop: GetSetting command");
                let _ = reply.send(store.get_setting(&key).map_err(StateError::from));
            }

            StateCommand::SetSetting { key, value, reply } => {
                debug!(%key, "actor_loop: SetSetting command");
                let _ = reply.send(store.set_setting(&key, &value).map_err(StateError::from));
            }

            StateCommand::DeleteSetting { key, reply } => {
                debug!(%key, "actor_loop: DeleteSetting command");
                let _ = reply.send(store.delete_setting(&key).map_err(StateError::from));
            }

            StateCommand::ListSettings { reply } => {
                debug!("actor_loop: ListSettings command");
                let _ = reply.send(store.list_settings().map_err(StateError::from));
            }

            StateCommand::RecordPost { post, reply } => {
                debug!(kind = %post.kind, "actor_loop: RecordPost command");
                let _ = reply.send(store.record_post(&post).map_err(StateError::from));
            }

            StateCommand::ListPosts { limit, reply } => {
                debug!(limit, "actor_loop: ListPosts command");
                let _ = reply.send(store.list_posts(limit).map_err(StateError::from));
            }

            StateCommand::Shutdown => {
                info!("StateManager shutting down");
                break;
            }
        }
    }

    debug!("StateManager actor stopped");
}
