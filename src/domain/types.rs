//! Shared types for the stay pipeline

use crate::domain::geo;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate a new UUIDv7 (time-sortable)
pub fn new_uuid_v7() -> String {
    Uuid::now_v7().to_string()
}

/// Minutes between two timestamps as a float (negative if `b < a`)
#[inline]
pub fn minutes_between(a: NaiveDateTime, b: NaiveDateTime) -> f64 {
    (b - a).num_seconds() as f64 / 60.0
}

/// Parse a point timestamp into a naive local datetime.
///
/// Any timezone offset is stripped, not converted: `2025-01-01T10:00:00+09:00`
/// becomes `2025-01-01 10:00:00`. This is the run's fixed convention and is
/// applied uniformly to points and existing records.
pub fn parse_naive_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    const FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// A point record as read from a CSV batch, before validation.
///
/// All fields are optional at this stage; the preprocessor drops rows
/// missing `time`, `lat` or `lon`.
#[derive(Debug, Clone, Default)]
pub struct RawFix {
    pub time: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub accuracy: Option<f64>,
}

/// A validated, smoothed GPS fix. Immutable once produced by the preprocessor.
#[derive(Debug, Clone)]
pub struct GpsPoint {
    pub timestamp: NaiveDateTime,
    pub lat: f64,
    pub lon: f64,
    pub accuracy: Option<f64>,
    pub smoothed_lat: f64,
    pub smoothed_lon: f64,
}

/// Coarse rounded-coordinate hash used as a cheap same-place proxy
/// before geocoding
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceKey(pub String);

impl PlaceKey {
    /// Build a place key from a centroid, rounded to ~10m precision
    pub fn from_centroid(lat: f64, lon: f64) -> Self {
        Self(format!(
            "{:.prec$},{:.prec$}",
            geo::round_coord(lat),
            geo::round_coord(lon),
            prec = geo::PLACE_KEY_PRECISION as usize
        ))
    }
}

impl std::fmt::Display for PlaceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A detected stationary cluster
#[derive(Debug, Clone)]
pub struct StayEvent {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_minutes: f64,
    pub centroid_lat: f64,
    pub centroid_lon: f64,
    pub place_key: PlaceKey,
}

impl StayEvent {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, centroid_lat: f64, centroid_lon: f64) -> Self {
        Self {
            start,
            end,
            duration_minutes: minutes_between(start, end),
            centroid_lat,
            centroid_lon,
            place_key: PlaceKey::from_centroid(centroid_lat, centroid_lon),
        }
    }

    /// Extend the stay to a later end; start and centroid are retained
    pub fn extend_to(&mut self, end: NaiveDateTime) {
        self.end = end;
        self.duration_minutes = minutes_between(self.start, self.end);
    }
}

/// Place name and address from the external resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPlace {
    pub name: String,
    pub address: String,
}

impl ResolvedPlace {
    /// Sentinel used when the resolver fails or returns nothing usable
    pub fn unresolved() -> Self {
        Self { name: "unresolved".to_string(), address: "unresolved".to_string() }
    }
}

/// A finalized, place-annotated visit. Created once by the pipeline
/// and terminal thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitRecord {
    pub id: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_minutes: f64,
    pub centroid_lat: f64,
    pub centroid_lon: f64,
    pub place_key: PlaceKey,
    pub place_name: String,
    pub address: String,
    pub tag: String,
}

impl VisitRecord {
    pub fn from_stay(stay: &StayEvent, place: &ResolvedPlace, tag: &str) -> Self {
        Self {
            id: new_uuid_v7(),
            start: stay.start,
            end: stay.end,
            duration_minutes: stay.duration_minutes,
            centroid_lat: stay.centroid_lat,
            centroid_lon: stay.centroid_lon,
            place_key: stay.place_key.clone(),
            place_name: place.name.clone(),
            address: place.address.clone(),
            tag: tag.to_string(),
        }
    }

    /// Extend the visit to a later end; start and centroid are retained
    pub fn extend_to(&mut self, end: NaiveDateTime) {
        self.end = end;
        self.duration_minutes = minutes_between(self.start, self.end);
    }
}

/// A previously persisted visit, supplied by the records store.
/// Read-only input for deduplication and tag memory seeding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistingRecord {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub place_name: String,
    #[serde(default)]
    pub tag: Option<String>,
}

/// Per-day movement summary
#[derive(Debug, Clone, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub distance_km: f64,
    pub duration_minutes: i64,
    pub route: String,
    pub map_url: String,
    pub places: Vec<String>,
}
