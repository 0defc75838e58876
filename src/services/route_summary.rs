//! Per-day movement summaries
//!
//! Groups the smoothed point stream by local date and accumulates travel
//! distance between consecutive retained path points. A point is retained
//! only when it moved at least the minimum move distance from the
//! previously retained one, so jitter around a stay does not count as
//! travel.

use crate::domain::geo::haversine_m;
use crate::domain::types::{DaySummary, GpsPoint, VisitRecord};
use crate::infra::config::Config;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

/// Path coordinates shown in the route preview string
const ROUTE_PREVIEW_POINTS: usize = 5;

/// Builds per-day travel summaries from the smoothed point stream
pub struct RouteSummarizer {
    min_move_distance_m: f64,
}

impl RouteSummarizer {
    pub fn new(min_move_distance_m: f64) -> Self {
        Self { min_move_distance_m }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.min_move_distance_m())
    }

    /// Summarize a time-ascending point sequence, one summary per day with
    /// meaningful movement. Visited place names are taken from the visits
    /// emitted for that day.
    pub fn summarize(&self, points: &[GpsPoint], visits: &[VisitRecord]) -> Vec<DaySummary> {
        let mut by_day: BTreeMap<NaiveDate, Vec<&GpsPoint>> = BTreeMap::new();
        for point in points {
            by_day.entry(point.timestamp.date()).or_default().push(point);
        }

        let mut summaries = Vec::new();
        for (date, day_points) in by_day {
            if day_points.len() < 2 {
                continue;
            }

            let mut distance_m = 0.0;
            let mut path: Vec<&GpsPoint> = vec![day_points[0]];
            for &point in &day_points[1..] {
                let last = path[path.len() - 1];
                let d = haversine_m(last.lat, last.lon, point.lat, point.lon);
                if d >= self.min_move_distance_m {
                    distance_m += d;
                    path.push(point);
                }
            }

            if path.len() < 2 {
                debug!(date = %date, "day_skipped_no_movement");
                continue;
            }

            let duration_minutes = (day_points[day_points.len() - 1].timestamp
                - day_points[0].timestamp)
                .num_minutes();

            let route = path
                .iter()
                .take(ROUTE_PREVIEW_POINTS)
                .map(|p| format!("{:.3},{:.3}", p.lat, p.lon))
                .collect::<Vec<_>>()
                .join(" → ");

            let coords = path
                .iter()
                .map(|p| format!("{},{}", p.lat, p.lon))
                .collect::<Vec<_>>()
                .join("/");
            let map_url = format!("https://www.google.com/maps/dir/{}", coords);

            let mut places: Vec<String> = Vec::new();
            for visit in visits.iter().filter(|v| v.start.date() == date) {
                if !places.contains(&visit.place_name) {
                    places.push(visit.place_name.clone());
                }
            }

            summaries.push(DaySummary {
                date,
                distance_km: distance_m / 1000.0,
                duration_minutes,
                route,
                map_url,
                places,
            });
        }

        summaries
    }
}
