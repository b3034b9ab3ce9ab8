//! Database schema

/// Bumped whenever the DDL below changes shape
pub const SCHEMA_VERSION: i64 = 1;

/// Idempotent DDL, applied on every open
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS locations (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    name             TEXT    NOT NULL,
    country          TEXT    NOT NULL,
    region           TEXT    NOT NULL DEFAULT '',
    lat              REAL    NOT NULL,
    lng              REAL    NOT NULL,
    timezone         TEXT    NOT NULL,
    currency         TEXT    NOT NULL,
    language         TEXT    NOT NULL,
    is_current       INTEGER NOT NULL DEFAULT 0,
    is_visited       INTEGER NOT NULL DEFAULT 0,
    planned_arrival  TEXT    NOT NULL,
    planned_duration INTEGER NOT NULL,
    current_day      INTEGER NOT NULL DEFAULT 1,
    order_in_journey INTEGER NOT NULL UNIQUE,
    created_at       INTEGER NOT NULL
);

-- At most one row may be current
CREATE UNIQUE INDEX IF NOT EXISTS idx_locations_single_current
    ON locations(is_current) WHERE is_current = 1;

CREATE TABLE IF NOT EXISTS points_of_interest (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    location_id   INTEGER NOT NULL REFERENCES locations(id),
    kind          TEXT    NOT NULL CHECK (kind IN ('attraction', 'restaurant')),
    name          TEXT    NOT NULL,
    description   TEXT    NOT NULL DEFAULT '',
    hours_weekday TEXT,
    hours_weekend TEXT,
    website       TEXT,
    created_at    INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_poi_location_kind
    ON points_of_interest(location_id, kind);

CREATE TABLE IF NOT EXISTS visits (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    poi_id           INTEGER NOT NULL REFERENCES points_of_interest(id),
    visit_date       TEXT    NOT NULL,
    included_in_post INTEGER NOT NULL DEFAULT 0,
    created_at       INTEGER NOT NULL,
    UNIQUE (poi_id, visit_date)
);

CREATE TABLE IF NOT EXISTS transportation_legs (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    from_location_id INTEGER NOT NULL REFERENCES locations(id),
    to_location_id   INTEGER NOT NULL REFERENCES locations(id),
    mode             TEXT    NOT NULL,
    departure_at     TEXT    NOT NULL,
    arrival_at       TEXT    NOT NULL,
    distance_km      REAL    NOT NULL,
    duration_minutes INTEGER NOT NULL,
    price_eur        REAL    NOT NULL,
    created_at       INTEGER NOT NULL,
    UNIQUE (from_location_id, to_location_id)
);

CREATE TABLE IF NOT EXISTS used_content (
    fingerprint TEXT    PRIMARY KEY,
    source      TEXT    NOT NULL,
    kind        TEXT    NOT NULL,
    created_at  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS settings (
    key        TEXT    PRIMARY KEY,
    value      TEXT    NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS posts (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    kind        TEXT    NOT NULL,
    location_id INTEGER NOT NULL REFERENCES locations(id),
    post_date   TEXT    NOT NULL,
    remote_id   TEXT    NOT NULL,
    url         TEXT    NOT NULL,
    title       TEXT    NOT NULL,
    tags        TEXT    NOT NULL DEFAULT '[]',
    created_at  INTEGER NOT NULL
);
"#;
