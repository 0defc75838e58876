//! Visit record store - JSONL persistence and existing-records reads
//!
//! Visits are written in JSONL format (one JSON object per line). The same
//! file doubles as the existing-records source for deduplication and tag
//! memory seeding: a read failure degrades the run to an empty set with a
//! warning instead of aborting.

use crate::domain::types::{ExistingRecord, VisitRecord};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

/// Persistence sink for finalized visits. A failure for one record must
/// not prevent processing of subsequent records.
pub trait VisitSink {
    fn append(&mut self, visit: &VisitRecord) -> anyhow::Result<()>;
}

/// JSONL-backed visit store
pub struct RecordStore {
    file_path: String,
}

impl RecordStore {
    pub fn new(file_path: &str) -> Self {
        info!(file_path = %file_path, "record_store_initialized");
        Self { file_path: file_path.to_string() }
    }

    /// Read previously persisted records.
    ///
    /// A missing file is a normal first run. Any other failure is surfaced
    /// as a run-level warning and the run continues with an empty set,
    /// accepting the risk of duplicate emission.
    pub fn read_existing(&self) -> Vec<ExistingRecord> {
        let path = Path::new(&self.file_path);
        if !path.exists() {
            info!(file = %self.file_path, "no_existing_records");
            return Vec::new();
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(file = %self.file_path, error = %e, "existing_records_unavailable");
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        let mut bad_lines = 0usize;
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ExistingRecord>(line) {
                Ok(record) => records.push(record),
                Err(_) => bad_lines += 1,
            }
        }
        if bad_lines > 0 {
            warn!(file = %self.file_path, bad_lines = %bad_lines, "existing_records_partially_unreadable");
        }
        debug!(file = %self.file_path, records = %records.len(), "existing_records_read");
        records
    }

    /// Append a line to the store file
    fn append_line(&self, line: &str) -> std::io::Result<()> {
        let path = Path::new(&self.file_path);

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        writeln!(file, "{}", line)?;
        debug!(file = %self.file_path, bytes = %line.len(), "record_written");

        Ok(())
    }
}

impl VisitSink for RecordStore {
    fn append(&mut self, visit: &VisitRecord) -> anyhow::Result<()> {
        let json = serde_json::to_string(visit)?;
        self.append_line(&json)?;
        info!(
            id = %visit.id,
            place_name = %visit.place_name,
            tag = %visit.tag,
            duration_minutes = %visit.duration_minutes,
            "visit_persisted"
        );
        Ok(())
    }
}
