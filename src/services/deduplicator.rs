//! Deduplication against previously recorded stays
//!
//! A candidate is suppressed when any known record's start lies strictly
//! within the tolerance of the candidate's start, regardless of place.
//! All comparisons are on naive local timestamps; offsets were stripped
//! at parse time.

use crate::domain::types::ExistingRecord;
use crate::infra::config::Config;
use chrono::NaiveDateTime;
use tracing::debug;

/// Suppresses candidate stays that collide with known record starts
pub struct Deduplicator {
    tolerance_secs: i64,
    known_starts: Vec<NaiveDateTime>,
}

impl Deduplicator {
    pub fn new(tolerance_secs: i64) -> Self {
        Self { tolerance_secs, known_starts: Vec::new() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.dedup_tolerance_secs())
    }

    /// Seed the known set from previously persisted records
    pub fn seed_from_existing(&mut self, records: &[ExistingRecord]) {
        self.known_starts.extend(records.iter().map(|r| r.start));
        debug!(known = %self.known_starts.len(), "dedup_seeded");
    }

    /// True if the candidate start collides with a known start
    pub fn is_duplicate(&self, start: NaiveDateTime) -> bool {
        self.known_starts
            .iter()
            .any(|known| (start - *known).num_seconds().abs() < self.tolerance_secs)
    }

    /// Register a newly accepted record so same-run candidates also dedupe
    pub fn register(&mut self, start: NaiveDateTime) {
        self.known_starts.push(start);
    }

    pub fn known_count(&self) -> usize {
        self.known_starts.len()
    }
}
