//! Stay detection - segmentation of the smoothed point stream into
//! stationary clusters
//!
//! Anchor-expansion policy: a cluster grows while points remain strictly
//! within the stay radius of its first point (the anchor). The first point
//! at or beyond the radius closes the cluster and becomes the next anchor,
//! so no point is double-counted.

use crate::domain::geo::{self, haversine_m};
use crate::domain::types::{minutes_between, GpsPoint, StayEvent};
use crate::infra::config::Config;
use tracing::debug;

/// Segments a smoothed point sequence into candidate stay events
pub struct StayDetector {
    min_stay_minutes: f64,
    stay_radius_m: f64,
}

impl StayDetector {
    pub fn new(min_stay_minutes: f64, stay_radius_m: f64) -> Self {
        Self { min_stay_minutes, stay_radius_m }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.min_stay_minutes(), config.stay_radius_m())
    }

    /// Detect stays over a time-ascending smoothed point sequence.
    ///
    /// Emitted events cover disjoint, time-ascending point ranges; an empty
    /// or single-point input yields no stays.
    pub fn detect(&self, points: &[GpsPoint]) -> Vec<StayEvent> {
        let mut stays = Vec::new();
        if points.is_empty() {
            return stays;
        }

        let mut cluster_start = 0usize;
        for i in 1..points.len() {
            let anchor = &points[cluster_start];
            let candidate = &points[i];
            let distance = haversine_m(
                anchor.smoothed_lat,
                anchor.smoothed_lon,
                candidate.smoothed_lat,
                candidate.smoothed_lon,
            );

            if distance < self.stay_radius_m {
                continue;
            }

            if let Some(stay) = self.close_cluster(&points[cluster_start..i]) {
                stays.push(stay);
            }
            cluster_start = i;
        }

        if let Some(stay) = self.close_cluster(&points[cluster_start..]) {
            stays.push(stay);
        }

        stays
    }

    /// Close a cluster: emit a stay if it spans the minimum duration,
    /// otherwise discard it silently.
    fn close_cluster(&self, members: &[GpsPoint]) -> Option<StayEvent> {
        if members.len() < 2 {
            return None;
        }

        let start = members[0].timestamp;
        let end = members[members.len() - 1].timestamp;
        let span = minutes_between(start, end);
        if span < self.min_stay_minutes {
            debug!(span_minutes = %span, points = %members.len(), "cluster_discarded_short");
            return None;
        }

        let (centroid_lat, centroid_lon) =
            geo::centroid(members.iter().map(|p| (p.smoothed_lat, p.smoothed_lon)))?;
        let stay = StayEvent::new(start, end, centroid_lat, centroid_lon);

        debug!(
            start = %stay.start,
            end = %stay.end,
            duration_minutes = %stay.duration_minutes,
            place_key = %stay.place_key,
            points = %members.len(),
            "stay_detected"
        );
        Some(stay)
    }
}
