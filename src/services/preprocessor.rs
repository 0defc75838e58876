//! Point preprocessing - validation, accuracy gating, sorting, smoothing
//!
//! Output length always equals input length after filtering: smoothing
//! never drops points.

use crate::domain::types::{parse_naive_timestamp, GpsPoint, RawFix};
use crate::infra::config::Config;
use crate::infra::stats::RunStats;
use tracing::debug;

/// Filters and smooths raw point batches into time-ascending `GpsPoint`s
pub struct Preprocessor {
    accuracy_limit: Option<f64>,
    smoothing_window: usize,
}

impl Preprocessor {
    pub fn new(accuracy_limit: Option<f64>, smoothing_window: usize) -> Self {
        // A centered window must be odd; an even width would otherwise act
        // like the next odd size through the half-width arithmetic
        let smoothing_window = smoothing_window.max(1);
        let smoothing_window =
            if smoothing_window % 2 == 0 { smoothing_window + 1 } else { smoothing_window };
        Self { accuracy_limit, smoothing_window }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.accuracy_limit(), config.smoothing_window())
    }

    /// Validate, gate, sort and smooth a raw batch.
    ///
    /// Rows missing `time`, `lat` or `lon` (or with an unparseable
    /// timestamp) are dropped and counted; an empty result is valid.
    pub fn process(&self, fixes: &[RawFix], stats: &RunStats) -> Vec<GpsPoint> {
        let mut valid: Vec<(chrono::NaiveDateTime, f64, f64, Option<f64>)> = Vec::new();

        for fix in fixes {
            let (time, lat, lon) = match (&fix.time, fix.lat, fix.lon) {
                (Some(t), Some(lat), Some(lon)) => (t, lat, lon),
                _ => {
                    stats.record_row_skipped();
                    continue;
                }
            };
            let timestamp = match parse_naive_timestamp(time) {
                Some(ts) => ts,
                None => {
                    debug!(time = %time, "row_skipped_bad_timestamp");
                    stats.record_row_skipped();
                    continue;
                }
            };
            if let (Some(limit), Some(accuracy)) = (self.accuracy_limit, fix.accuracy) {
                if accuracy > limit {
                    stats.record_row_filtered_accuracy();
                    continue;
                }
            }
            valid.push((timestamp, lat, lon, fix.accuracy));
        }

        // Stable sort: ties keep original relative order
        valid.sort_by_key(|&(ts, ..)| ts);

        self.smooth(&valid)
    }

    /// Centered moving average; the window shrinks symmetrically at the
    /// sequence boundaries (never below a single point).
    fn smooth(
        &self,
        points: &[(chrono::NaiveDateTime, f64, f64, Option<f64>)],
    ) -> Vec<GpsPoint> {
        let n = points.len();
        let half = self.smoothing_window / 2;

        points
            .iter()
            .enumerate()
            .map(|(i, &(timestamp, lat, lon, accuracy))| {
                let k = half.min(i).min(n - 1 - i);
                let window = &points[i - k..=i + k];
                let len = window.len() as f64;
                let smoothed_lat = window.iter().map(|p| p.1).sum::<f64>() / len;
                let smoothed_lon = window.iter().map(|p| p.2).sum::<f64>() / len;
                GpsPoint { timestamp, lat, lon, accuracy, smoothed_lat, smoothed_lon }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(time: &str, lat: f64, lon: f64, accuracy: Option<f64>) -> RawFix {
        RawFix { time: Some(time.to_string()), lat: Some(lat), lon: Some(lon), accuracy }
    }

    #[test]
    fn test_drops_rows_missing_fields() {
        let stats = RunStats::new();
        let fixes = vec![
            fix("2025-01-01 10:00:00", 37.5, 127.0, None),
            RawFix { time: None, lat: Some(37.5), lon: Some(127.0), accuracy: None },
            RawFix { time: Some("2025-01-01 10:01:00".to_string()), lat: None, lon: Some(127.0), accuracy: None },
        ];

        let points = Preprocessor::new(None, 1).process(&fixes, &stats);

        assert_eq!(points.len(), 1);
        assert_eq!(stats.report().rows_skipped, 2);
    }

    #[test]
    fn test_drops_unparseable_timestamp() {
        let stats = RunStats::new();
        let fixes = vec![fix("yesterday-ish", 37.5, 127.0, None)];

        let points = Preprocessor::new(None, 1).process(&fixes, &stats);

        assert!(points.is_empty());
        assert_eq!(stats.report().rows_skipped, 1);
    }

    #[test]
    fn test_empty_input_is_valid() {
        let stats = RunStats::new();
        let points = Preprocessor::new(None, 3).process(&[], &stats);
        assert!(points.is_empty());
    }

    #[test]
    fn test_accuracy_gate() {
        let stats = RunStats::new();
        let fixes = vec![
            fix("2025-01-01 10:00:00", 37.5, 127.0, Some(12.0)),
            fix("2025-01-01 10:01:00", 37.5, 127.0, Some(80.0)),
            // Missing accuracy is kept when a limit is set
            fix("2025-01-01 10:02:00", 37.5, 127.0, None),
        ];

        let points = Preprocessor::new(Some(50.0), 1).process(&fixes, &stats);

        assert_eq!(points.len(), 2);
        assert_eq!(stats.report().rows_filtered_accuracy, 1);
    }

    #[test]
    fn test_sorts_ascending_by_timestamp() {
        let stats = RunStats::new();
        let fixes = vec![
            fix("2025-01-01 10:05:00", 2.0, 2.0, None),
            fix("2025-01-01 10:00:00", 1.0, 1.0, None),
            fix("2025-01-01 10:10:00", 3.0, 3.0, None),
        ];

        let points = Preprocessor::new(None, 1).process(&fixes, &stats);

        assert_eq!(points[0].lat, 1.0);
        assert_eq!(points[1].lat, 2.0);
        assert_eq!(points[2].lat, 3.0);
    }

    #[test]
    fn test_smoothing_preserves_length() {
        let stats = RunStats::new();
        let fixes: Vec<RawFix> = (0..7)
            .map(|i| fix(&format!("2025-01-01 10:0{}:00", i), 37.5 + i as f64 * 0.001, 127.0, None))
            .collect();

        for window in [1, 3, 5, 7, 9] {
            let points = Preprocessor::new(None, window).process(&fixes, &stats);
            assert_eq!(points.len(), 7, "window {}", window);
        }
    }

    #[test]
    fn test_even_window_acts_as_next_odd() {
        let stats = RunStats::new();
        let fixes: Vec<RawFix> = (0..5)
            .map(|i| fix(&format!("2025-01-01 10:0{}:00", i), i as f64, 0.0, None))
            .collect();

        let even = Preprocessor::new(None, 2).process(&fixes, &stats);
        let odd = Preprocessor::new(None, 3).process(&fixes, &stats);

        for (a, b) in even.iter().zip(&odd) {
            assert_eq!(a.smoothed_lat, b.smoothed_lat);
        }
    }

    #[test]
    fn test_window_one_is_identity() {
        let stats = RunStats::new();
        let fixes = vec![fix("2025-01-01 10:00:00", 37.5432, 127.0123, None)];

        let points = Preprocessor::new(None, 1).process(&fixes, &stats);

        assert_eq!(points[0].smoothed_lat, 37.5432);
        assert_eq!(points[0].smoothed_lon, 127.0123);
    }

    #[test]
    fn test_moving_average_interior() {
        let stats = RunStats::new();
        let fixes = vec![
            fix("2025-01-01 10:00:00", 1.0, 10.0, None),
            fix("2025-01-01 10:01:00", 2.0, 20.0, None),
            fix("2025-01-01 10:02:00", 3.0, 30.0, None),
        ];

        let points = Preprocessor::new(None, 3).process(&fixes, &stats);

        // Interior point averages its full window
        assert_eq!(points[1].smoothed_lat, 2.0);
        assert_eq!(points[1].smoothed_lon, 20.0);
        // Boundary points shrink to a single-point window
        assert_eq!(points[0].smoothed_lat, 1.0);
        assert_eq!(points[2].smoothed_lat, 3.0);
        // Raw coordinates are untouched
        assert_eq!(points[1].lat, 2.0);
    }

    #[test]
    fn test_boundary_window_shrinks_symmetrically() {
        let stats = RunStats::new();
        let fixes = vec![
            fix("2025-01-01 10:00:00", 0.0, 0.0, None),
            fix("2025-01-01 10:01:00", 2.0, 0.0, None),
            fix("2025-01-01 10:02:00", 4.0, 0.0, None),
            fix("2025-01-01 10:03:00", 6.0, 0.0, None),
            fix("2025-01-01 10:04:00", 8.0, 0.0, None),
        ];

        let points = Preprocessor::new(None, 5).process(&fixes, &stats);

        // Index 1 can only reach one point to the left, so the window is 3 wide
        assert_eq!(points[1].smoothed_lat, 2.0);
        // Index 2 uses the full 5-point window
        assert_eq!(points[2].smoothed_lat, 4.0);
        // Index 3 mirrors index 1
        assert_eq!(points[3].smoothed_lat, 6.0);
    }
}
