//! Per-run counters for the stay pipeline
//!
//! Lock-free counters updated as the pipeline runs; `report()` snapshots
//! them into a `RunSummary` that is logged once at the end of a run.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Counters for one pipeline run
#[derive(Debug, Default)]
pub struct RunStats {
    /// Point rows read from the source, valid or not
    rows_read: AtomicU64,
    /// Rows dropped for missing fields or unparseable timestamps
    rows_skipped: AtomicU64,
    /// Rows dropped by the accuracy gate
    rows_filtered_accuracy: AtomicU64,
    /// Candidate stays after detection and place-key merging
    stays_detected: AtomicU64,
    /// Candidates suppressed as already recorded
    deduplicated: AtomicU64,
    /// Resolver calls that degraded to the unresolved fallback
    resolve_fallbacks: AtomicU64,
    /// Visits merged away in the post-resolution pass
    merged_resolved: AtomicU64,
    /// Visit records emitted to the sink
    emitted: AtomicU64,
    /// Sink writes that failed (run continues)
    sink_failures: AtomicU64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_rows_read(&self, n: u64) {
        self.rows_read.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_row_skipped(&self) {
        self.rows_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_row_filtered_accuracy(&self) {
        self.rows_filtered_accuracy.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stays_detected(&self, n: u64) {
        self.stays_detected.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_deduplicated(&self) {
        self.deduplicated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_resolve_fallback(&self) {
        self.resolve_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_merged_resolved(&self) {
        self.merged_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_emitted(&self) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sink_failure(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot all counters
    pub fn report(&self) -> RunSummary {
        RunSummary {
            rows_read: self.rows_read.load(Ordering::Relaxed),
            rows_skipped: self.rows_skipped.load(Ordering::Relaxed),
            rows_filtered_accuracy: self.rows_filtered_accuracy.load(Ordering::Relaxed),
            stays_detected: self.stays_detected.load(Ordering::Relaxed),
            deduplicated: self.deduplicated.load(Ordering::Relaxed),
            resolve_fallbacks: self.resolve_fallbacks.load(Ordering::Relaxed),
            merged_resolved: self.merged_resolved.load(Ordering::Relaxed),
            emitted: self.emitted.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of run counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub rows_read: u64,
    pub rows_skipped: u64,
    pub rows_filtered_accuracy: u64,
    pub stays_detected: u64,
    pub deduplicated: u64,
    pub resolve_fallbacks: u64,
    pub merged_resolved: u64,
    pub emitted: u64,
    pub sink_failures: u64,
}

impl RunSummary {
    pub fn log(&self) {
        info!(
            rows_read = %self.rows_read,
            rows_skipped = %self.rows_skipped,
            rows_filtered_accuracy = %self.rows_filtered_accuracy,
            stays_detected = %self.stays_detected,
            deduplicated = %self.deduplicated,
            resolve_fallbacks = %self.resolve_fallbacks,
            merged_resolved = %self.merged_resolved,
            emitted = %self.emitted,
            sink_failures = %self.sink_failures,
            "run_complete"
        );
    }
}
