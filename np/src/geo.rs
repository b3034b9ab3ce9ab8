//! Geo/transport estimator
//!
//! Pure functions: routed distance between two coordinates, transport mode
//! classification and duration/price heuristics per mode.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use placestore::{Coordinates, NewLeg, TransportMode};
use tracing::debug;

/// Mean Earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Roads and rails are never straight lines
pub const DETOUR_FACTOR: f64 = 1.3;

/// Above this routed distance the persona flies
pub const AIRPLANE_THRESHOLD_KM: f64 = 700.0;

/// Above this routed distance the persona takes the train
pub const TRAIN_THRESHOLD_KM: f64 = 300.0;

/// Departure time used for every leg
const DEPARTURE_HOUR: u32 = 9;

/// Great-circle distance multiplied by the detour factor, in kilometers
pub fn distance_km(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    let km = EARTH_RADIUS_KM * c * DETOUR_FACTOR;
    debug!(km, "distance_km: computed");
    km
}

/// Boundary values resolve to the lower tier
pub fn classify_transport(distance_km: f64) -> TransportMode {
    if distance_km > AIRPLANE_THRESHOLD_KM {
        TransportMode::Airplane
    } else if distance_km > TRAIN_THRESHOLD_KM {
        TransportMode::Train
    } else {
        TransportMode::Bus
    }
}

/// Average speed (km/h) and fixed overhead (hours) per mode
fn speed_profile(mode: TransportMode) -> (f64, f64) {
    match mode {
        TransportMode::Bus => (60.0, 0.5),
        TransportMode::Train => (90.0, 0.5),
        // Overhead covers getting to the airport, security and boarding
        TransportMode::Airplane => (700.0, 3.0),
    }
}

/// Price per km (EUR) and base fare (EUR) per mode
fn price_profile(mode: TransportMode) -> (f64, f64) {
    match mode {
        TransportMode::Bus => (0.08, 5.0),
        TransportMode::Train => (0.15, 10.0),
        TransportMode::Airplane => (0.10, 50.0),
    }
}

/// Estimated door-to-door travel time in minutes
pub fn estimate_duration_minutes(distance_km: f64, mode: TransportMode) -> u32 {
    let (speed, overhead) = speed_profile(mode);
    let hours = distance_km.max(0.0) / speed + overhead;
    (hours * 60.0).round() as u32
}

/// Estimated ticket price in EUR, rounded to cents
pub fn estimate_price_eur(distance_km: f64, mode: TransportMode) -> f64 {
    let (per_km, base) = price_profile(mode);
    let price = distance_km.max(0.0) * per_km + base;
    (price * 100.0).round() / 100.0
}

/// Build the leg for a move departing on `date`
pub fn plan_leg(from: Coordinates, to: Coordinates, date: NaiveDate) -> NewLeg {
    let distance = distance_km(from, to);
    let mode = classify_transport(distance);
    let duration_minutes = estimate_duration_minutes(distance, mode);
    let departure_at = NaiveDateTime::new(
        date,
        NaiveTime::from_hms_opt(DEPARTURE_HOUR, 0, 0).unwrap_or(NaiveTime::MIN),
    );
    let arrival_at = departure_at + TimeDelta::minutes(i64::from(duration_minutes));
    debug!(distance, %mode, duration_minutes, "plan_leg: planned");

    NewLeg {
        mode,
        departure_at,
        arrival_at,
        distance_km: (distance * 10.0).round() / 10.0,
        duration_minutes,
        price_eur: estimate_price_eur(distance, mode),
    }
}
