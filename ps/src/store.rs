//! Core PlaceStore implementation

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use eyre::{Context, Result, bail, eyre};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use tracing::{debug, info};

use crate::models::{
    Coordinates, Locale, Location, LocationId, NewLeg, NewLocation, NewPoi, NewPost, OpeningHours, Poi, PoiId,
    PoiKind, PostKind, PostRecord, Setting, TransportLeg, TransportMode, UsedContent,
};
use crate::now_ms;
use crate::schema::{SCHEMA, SCHEMA_VERSION};

/// Database file name inside the store directory
pub const DB_FILE_NAME: &str = "placestore.db";

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const LOCATION_COLUMNS: &str = "id, name, country, region, lat, lng, timezone, currency, language, \
     is_current, is_visited, planned_arrival, planned_duration, current_day, order_in_journey, created_at";

const POI_COLUMNS: &str =
    "p.id, p.location_id, p.kind, p.name, p.description, p.hours_weekday, p.hours_weekend, p.website, p.created_at";

const LEG_COLUMNS: &str = "id, from_location_id, to_location_id, mode, departure_at, arrival_at, distance_km, \
     duration_minutes, price_eur, created_at";

const POST_COLUMNS: &str = "id, kind, location_id, post_date, remote_id, url, title, tags, created_at";

/// The place store
pub struct Store {
    conn: Connection,
    /// Store directory (None for in-memory stores)
    base_path: Option<PathBuf>,
}

impl Store {
    /// Open or create a store in the given directory
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        debug!(?base_path, "Store::open: called");
        fs::create_dir_all(&base_path).context("Failed to create store directory")?;

        let db_path = base_path.join(DB_FILE_NAME);
        let conn = Connection::open(&db_path).context(format!("Failed to open database {}", db_path.display()))?;
        let store = Self::init(conn, Some(base_path))?;
        info!(db = %db_path.display(), "Opened place store");
        Ok(store)
    }

    /// Open a throwaway in-memory store
    pub fn open_in_memory() -> Result<Self> {
        debug!("Store::open_in_memory: called");
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, base_path: Option<PathBuf>) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)
            .context("Failed to enable foreign keys")?;
        conn.execute_batch(SCHEMA).context("Failed to apply schema")?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .context("Failed to record schema version")?;
        Ok(Self { conn, base_path })
    }

    /// Directory backing this store, if any
    pub fn base_path(&self) -> Option<&Path> {
        self.base_path.as_deref()
    }

    // === Locations ===

    /// The location the persona is currently in
    pub fn current_location(&self) -> Result<Option<Location>> {
        debug!("Store::current_location: called");
        let sql = format!("SELECT {} FROM locations WHERE is_current = 1", LOCATION_COLUMNS);
        let location = self.conn.query_row(&sql, [], location_from_row).optional()?;
        Ok(location)
    }

    /// Get a location by id
    pub fn get_location(&self, id: LocationId) -> Result<Option<Location>> {
        debug!(id, "Store::get_location: called");
        let sql = format!("SELECT {} FROM locations WHERE id = ?1", LOCATION_COLUMNS);
        let location = self.conn.query_row(&sql, params![id], location_from_row).optional()?;
        Ok(location)
    }

    /// All locations in itinerary order
    pub fn list_locations(&self) -> Result<Vec<Location>> {
        debug!("Store::list_locations: called");
        let sql = format!("SELECT {} FROM locations ORDER BY order_in_journey", LOCATION_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], location_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Number of locations ever created
    pub fn location_count(&self) -> Result<u32> {
        let count: u32 = self.conn.query_row("SELECT COUNT(*) FROM locations", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Insert the first location of the journey and make it current
    ///
    /// Fails if any location already exists.
    pub fn start_journey(&mut self, first: &NewLocation, arrival: NaiveDate, planned_duration: u32) -> Result<Location> {
        debug!(name = %first.name, country = %first.country, "Store::start_journey: called");
        let tx = self.conn.transaction()?;

        let existing: u32 = tx.query_row("SELECT COUNT(*) FROM locations", [], |row| row.get(0))?;
        if existing > 0 {
            bail!("Journey already started ({} locations exist)", existing);
        }

        let id = insert_location(&tx, first, arrival, planned_duration, 1)?;
        tx.commit().context("Failed to commit journey start")?;

        info!(id, name = %first.name, country = %first.country, "Journey started");
        self.get_location(id)?
            .ok_or_else(|| eyre!("Location {} missing after insert", id))
    }

    /// Move the persona from `from_id` to a new location
    ///
    /// In one transaction: the old location stops being current and is marked
    /// visited, the new location is inserted as current with day 1 and the next
    /// journey order, and the transportation leg between them is recorded. Any
    /// failure rolls the whole move back.
    pub fn relocate(
        &mut self,
        from_id: LocationId,
        next: &NewLocation,
        arrival: NaiveDate,
        planned_duration: u32,
        leg: &NewLeg,
    ) -> Result<(Location, TransportLeg)> {
        debug!(from_id, name = %next.name, country = %next.country, "Store::relocate: called");
        let tx = self.conn.transaction()?;

        let current: Option<LocationId> = tx
            .query_row("SELECT id FROM locations WHERE is_current = 1", [], |row| row.get(0))
            .optional()?;
        match current {
            Some(id) if id == from_id => {}
            Some(id) => bail!("Location {} is not current (current is {})", from_id, id),
            None => bail!("No current location to move from"),
        }

        tx.execute(
            "UPDATE locations SET is_current = 0, is_visited = 1 WHERE id = ?1",
            params![from_id],
        )?;

        let order: u32 = tx.query_row(
            "SELECT COALESCE(MAX(order_in_journey), 0) + 1 FROM locations",
            [],
            |row| row.get(0),
        )?;
        let to_id = insert_location(&tx, next, arrival, planned_duration, order)?;

        tx.execute(
            "INSERT INTO transportation_legs (from_location_id, to_location_id, mode, departure_at, arrival_at, \
             distance_km, duration_minutes, price_eur, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                from_id,
                to_id,
                leg.mode.as_str(),
                leg.departure_at.format(DATETIME_FORMAT).to_string(),
                leg.arrival_at.format(DATETIME_FORMAT).to_string(),
                leg.distance_km,
                leg.duration_minutes,
                leg.price_eur,
                now_ms()
            ],
        )?;

        tx.commit().context("Failed to commit relocation")?;
        info!(from_id, to_id, order, mode = %leg.mode, "Relocated");

        let location = self
            .get_location(to_id)?
            .ok_or_else(|| eyre!("Location {} missing after insert", to_id))?;
        let leg = self
            .leg_between(from_id, to_id)?
            .ok_or_else(|| eyre!("Leg {} -> {} missing after insert", from_id, to_id))?;
        Ok((location, leg))
    }

    /// Advance the day counter of a location by one
    pub fn increment_day(&self, id: LocationId) -> Result<u32> {
        debug!(id, "Store::increment_day: called");
        let changed = self
            .conn
            .execute("UPDATE locations SET current_day = current_day + 1 WHERE id = ?1", params![id])?;
        if changed == 0 {
            bail!("Location {} not found", id);
        }
        let day: u32 = self
            .conn
            .query_row("SELECT current_day FROM locations WHERE id = ?1", params![id], |row| row.get(0))?;
        Ok(day)
    }

    // === Points of interest ===

    /// Persist a batch of POIs for a location
    pub fn insert_pois(&mut self, location_id: LocationId, pois: &[NewPoi]) -> Result<Vec<Poi>> {
        debug!(location_id, count = pois.len(), "Store::insert_pois: called");
        let tx = self.conn.transaction()?;

        let exists: bool = tx
            .query_row("SELECT 1 FROM locations WHERE id = ?1", params![location_id], |_| Ok(true))
            .optional()?
            .unwrap_or(false);
        if !exists {
            bail!("Location {} not found", location_id);
        }

        let mut ids = Vec::with_capacity(pois.len());
        for poi in pois {
            tx.execute(
                "INSERT INTO points_of_interest (location_id, kind, name, description, hours_weekday, hours_weekend, \
                 website, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    location_id,
                    poi.kind.as_str(),
                    poi.name,
                    poi.description,
                    poi.opening_hours.weekday,
                    poi.opening_hours.weekend,
                    poi.website,
                    now_ms()
                ],
            )?;
            ids.push(tx.last_insert_rowid());
        }
        tx.commit().context("Failed to commit points of interest")?;

        let mut inserted = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(poi) = self.get_poi(id)? {
                inserted.push(poi);
            }
        }
        Ok(inserted)
    }

    /// Get a POI by id
    pub fn get_poi(&self, id: PoiId) -> Result<Option<Poi>> {
        let sql = format!("SELECT {} FROM points_of_interest p WHERE p.id = ?1", POI_COLUMNS);
        let poi = self.conn.query_row(&sql, params![id], poi_from_row).optional()?;
        Ok(poi)
    }

    /// Every POI of a kind at a location
    pub fn list_pois(&self, location_id: LocationId, kind: PoiKind) -> Result<Vec<Poi>> {
        debug!(location_id, %kind, "Store::list_pois: called");
        let sql = format!(
            "SELECT {} FROM points_of_interest p WHERE p.location_id = ?1 AND p.kind = ?2 ORDER BY p.id",
            POI_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![location_id, kind.as_str()], poi_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// POIs of a kind that have never been included in a published post
    pub fn available_pois(&self, location_id: LocationId, kind: PoiKind) -> Result<Vec<Poi>> {
        debug!(location_id, %kind, "Store::available_pois: called");
        let sql = format!(
            "SELECT {} FROM points_of_interest p WHERE p.location_id = ?1 AND p.kind = ?2 AND NOT EXISTS \
             (SELECT 1 FROM visits v WHERE v.poi_id = p.id AND v.included_in_post = 1) ORDER BY p.id",
            POI_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![location_id, kind.as_str()], poi_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Number of available POIs of a kind at a location
    pub fn count_available(&self, location_id: LocationId, kind: PoiKind) -> Result<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM points_of_interest p WHERE p.location_id = ?1 AND p.kind = ?2 AND NOT EXISTS \
             (SELECT 1 FROM visits v WHERE v.poi_id = p.id AND v.included_in_post = 1)",
            params![location_id, kind.as_str()],
            |row| row.get(0),
        )?;
        debug!(location_id, %kind, count, "Store::count_available: counted");
        Ok(count)
    }

    // === Visits ===

    /// Create or update the visit of a POI on a date
    pub fn upsert_visit(&self, poi_id: PoiId, date: NaiveDate, included_in_post: bool) -> Result<()> {
        debug!(poi_id, %date, included_in_post, "Store::upsert_visit: called");
        upsert_visit(&self.conn, poi_id, date, included_in_post)
    }

    /// Whether a POI has a visit marked as published
    pub fn is_consumed(&self, poi_id: PoiId) -> Result<bool> {
        let consumed = self
            .conn
            .query_row(
                "SELECT 1 FROM visits WHERE poi_id = ?1 AND included_in_post = 1 LIMIT 1",
                params![poi_id],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(consumed)
    }

    /// Write back a published daily post
    ///
    /// In one transaction: marks each featured POI's visit for `date` as
    /// included in a post, advances the location's day counter and appends the
    /// post to the publication log.
    pub fn complete_daily_post(&mut self, poi_ids: &[PoiId], date: NaiveDate, post: &NewPost) -> Result<PostRecord> {
        debug!(location_id = post.location_id, ?poi_ids, %date, "Store::complete_daily_post: called");
        let tx = self.conn.transaction()?;

        let is_current: bool = tx
            .query_row(
                "SELECT is_current FROM locations WHERE id = ?1",
                params![post.location_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| eyre!("Location {} not found", post.location_id))?;
        if !is_current {
            bail!("Location {} is no longer current", post.location_id);
        }

        for poi_id in poi_ids {
            upsert_visit(&tx, *poi_id, date, true)?;
        }
        tx.execute(
            "UPDATE locations SET current_day = current_day + 1 WHERE id = ?1",
            params![post.location_id],
        )?;
        let id = insert_post(&tx, post)?;
        tx.commit().context("Failed to commit daily post")?;

        info!(location_id = post.location_id, post_id = id, "Daily post recorded");
        self.get_post(id)?.ok_or_else(|| eyre!("Post {} missing after insert", id))
    }

    // === Transportation legs ===

    /// The leg between two locations, if any
    pub fn leg_between(&self, from_id: LocationId, to_id: LocationId) -> Result<Option<TransportLeg>> {
        let sql = format!(
            "SELECT {} FROM transportation_legs WHERE from_location_id = ?1 AND to_location_id = ?2",
            LEG_COLUMNS
        );
        let leg = self.conn.query_row(&sql, params![from_id, to_id], leg_from_row).optional()?;
        Ok(leg)
    }

    /// The leg that brought the persona to a location
    pub fn leg_into(&self, to_id: LocationId) -> Result<Option<TransportLeg>> {
        let sql = format!("SELECT {} FROM transportation_legs WHERE to_location_id = ?1", LEG_COLUMNS);
        let leg = self.conn.query_row(&sql, params![to_id], leg_from_row).optional()?;
        Ok(leg)
    }

    /// All legs in creation order
    pub fn list_legs(&self) -> Result<Vec<TransportLeg>> {
        let sql = format!("SELECT {} FROM transportation_legs ORDER BY id", LEG_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], leg_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // === Used content ===

    /// Whether an asset fingerprint has been used before
    pub fn has_fingerprint(&self, fingerprint: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM used_content WHERE fingerprint = ?1",
                params![fingerprint],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        debug!(%fingerprint, found, "Store::has_fingerprint: checked");
        Ok(found)
    }

    /// Record an asset fingerprint; returns false if it was already present
    pub fn record_fingerprint(&self, fingerprint: &str, source: &str, kind: &str) -> Result<bool> {
        debug!(%fingerprint, %source, %kind, "Store::record_fingerprint: called");
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO used_content (fingerprint, source, kind, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![fingerprint, source, kind, now_ms()],
        )?;
        Ok(inserted > 0)
    }

    /// Most recent ledger entries
    pub fn list_used_content(&self, limit: usize) -> Result<Vec<UsedContent>> {
        let mut stmt = self.conn.prepare(
            "SELECT fingerprint, source, kind, created_at FROM used_content ORDER BY created_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(UsedContent {
                fingerprint: row.get(0)?,
                source: row.get(1)?,
                kind: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // === Settings ===

    /// Read a setting
    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM settings WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        debug!(%key, ?value, "Store::get_setting: read");
        Ok(value)
    }

    /// Write a setting
    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        debug!(%key, %value, "Store::set_setting: called");
        self.conn.execute(
            "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now_ms()],
        )?;
        Ok(())
    }

    /// Remove a setting; returns whether it existed
    pub fn delete_setting(&self, key: &str) -> Result<bool> {
        let removed = self.conn.execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    /// All settings ordered by key
    pub fn list_settings(&self) -> Result<Vec<Setting>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value, updated_at FROM settings ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok(Setting {
                key: row.get(0)?,
                value: row.get(1)?,
                updated_at: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // === Posts ===

    /// Append a post to the publication log
    pub fn record_post(&self, post: &NewPost) -> Result<PostRecord> {
        debug!(kind = %post.kind, location_id = post.location_id, "Store::record_post: called");
        let id = insert_post(&self.conn, post)?;
        self.get_post(id)?.ok_or_else(|| eyre!("Post {} missing after insert", id))
    }

    /// Get a post by id
    pub fn get_post(&self, id: i64) -> Result<Option<PostRecord>> {
        let sql = format!("SELECT {} FROM posts WHERE id = ?1", POST_COLUMNS);
        let post = self.conn.query_row(&sql, params![id], post_from_row).optional()?;
        Ok(post)
    }

    /// Most recent posts, newest first
    pub fn list_posts(&self, limit: usize) -> Result<Vec<PostRecord>> {
        let sql = format!("SELECT {} FROM posts ORDER BY id DESC LIMIT ?1", POST_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit as i64], post_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn insert_location(
    tx: &Transaction<'_>,
    location: &NewLocation,
    arrival: NaiveDate,
    planned_duration: u32,
    order: u32,
) -> Result<LocationId> {
    tx.execute(
        &format!(
            "INSERT INTO locations ({}) VALUES (NULL, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, 0, ?9, ?10, 1, ?11, ?12)",
            LOCATION_COLUMNS
        ),
        params![
            location.name.trim(),
            location.country.trim(),
            location.region.trim(),
            location.coordinates.lat,
            location.coordinates.lng,
            location.locale.timezone,
            location.locale.currency,
            location.locale.language,
            arrival.format(DATE_FORMAT).to_string(),
            planned_duration,
            order,
            now_ms()
        ],
    )?;
    Ok(tx.last_insert_rowid())
}

fn upsert_visit(conn: &Connection, poi_id: PoiId, date: NaiveDate, included_in_post: bool) -> Result<()> {
    conn.execute(
        "INSERT INTO visits (poi_id, visit_date, included_in_post, created_at) VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT(poi_id, visit_date) DO UPDATE SET included_in_post = excluded.included_in_post",
        params![poi_id, date.format(DATE_FORMAT).to_string(), included_in_post, now_ms()],
    )
    .context(format!("Failed to upsert visit for POI {}", poi_id))?;
    Ok(())
}

fn insert_post(conn: &Connection, post: &NewPost) -> Result<i64> {
    let tags = serde_json::to_string(&post.tags)?;
    conn.execute(
        "INSERT INTO posts (kind, location_id, post_date, remote_id, url, title, tags, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            post.kind.as_str(),
            post.location_id,
            post.post_date.format(DATE_FORMAT).to_string(),
            post.remote_id,
            post.url,
            post.title,
            tags,
            now_ms()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(idx)?;
    NaiveDate::parse_from_str(&text, DATE_FORMAT).map_err(|e| conversion_error(idx, e.to_string()))
}

fn datetime_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let text: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&text, DATETIME_FORMAT).map_err(|e| conversion_error(idx, e.to_string()))
}

fn location_from_row(row: &Row<'_>) -> rusqlite::Result<Location> {
    Ok(Location {
        id: row.get(0)?,
        name: row.get(1)?,
        country: row.get(2)?,
        region: row.get(3)?,
        coordinates: Coordinates::new(row.get(4)?, row.get(5)?),
        locale: Locale {
            timezone: row.get(6)?,
            currency: row.get(7)?,
            language: row.get(8)?,
        },
        is_current: row.get(9)?,
        is_visited: row.get(10)?,
        planned_arrival: date_column(row, 11)?,
        planned_duration: row.get(12)?,
        current_day: row.get(13)?,
        order_in_journey: row.get(14)?,
        created_at: row.get(15)?,
    })
}

fn poi_from_row(row: &Row<'_>) -> rusqlite::Result<Poi> {
    let kind: String = row.get(2)?;
    Ok(Poi {
        id: row.get(0)?,
        location_id: row.get(1)?,
        kind: kind.parse::<PoiKind>().map_err(|e| conversion_error(2, e))?,
        name: row.get(3)?,
        description: row.get(4)?,
        opening_hours: OpeningHours {
            weekday: row.get(5)?,
            weekend: row.get(6)?,
        },
        website: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn leg_from_row(row: &Row<'_>) -> rusqlite::Result<TransportLeg> {
    let mode: String = row.get(3)?;
    Ok(TransportLeg {
        id: row.get(0)?,
        from_location_id: row.get(1)?,
        to_location_id: row.get(2)?,
        mode: mode.parse::<TransportMode>().map_err(|e| conversion_error(3, e))?,
        departure_at: datetime_column(row, 4)?,
        arrival_at: datetime_column(row, 5)?,
        distance_km: row.get(6)?,
        duration_minutes: row.get(7)?,
        price_eur: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRecord> {
    let kind: String = row.get(1)?;
    let tags: String = row.get(7)?;
    Ok(PostRecord {
        id: row.get(0)?,
        kind: kind.parse::<PostKind>().map_err(|e| conversion_error(1, e))?,
        location_id: row.get(2)?,
        post_date: date_column(row, 3)?,
        remote_id: row.get(4)?,
        url: row.get(5)?,
        title: row.get(6)?,
        tags: serde_json::from_str(&tags).map_err(|e| conversion_error(7, e.to_string()))?,
        created_at: row.get(8)?,
    })
}
