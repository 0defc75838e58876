//! Point source - reads raw GPS fixes from CSV batches
//!
//! Every `*.csv` under the configured directory is one logical batch;
//! batches are concatenated in directory order. Column names are matched
//! case-insensitively and a few common aliases are accepted. A file that
//! fails to read is logged and skipped; it never fails the whole run.

use crate::domain::types::RawFix;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Reads point batches from a directory of CSV files
pub struct PointSource {
    dir: PathBuf,
}

/// Column indices resolved from a CSV header row
#[derive(Debug, Default)]
struct ColumnMap {
    time: Option<usize>,
    lat: Option<usize>,
    lon: Option<usize>,
    accuracy: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let mut map = Self::default();
        for (i, name) in headers.iter().enumerate() {
            match name.trim().to_lowercase().as_str() {
                "time" | "datetime" | "timestamp" => map.time = map.time.or(Some(i)),
                "lat" | "latitude" => map.lat = map.lat.or(Some(i)),
                "lon" | "lng" | "longitude" => map.lon = map.lon.or(Some(i)),
                "accuracy" => map.accuracy = map.accuracy.or(Some(i)),
                _ => {}
            }
        }
        map
    }
}

impl PointSource {
    pub fn new(dir: &str) -> Self {
        Self { dir: PathBuf::from(dir) }
    }

    /// Read all CSV batches under the source directory.
    ///
    /// Fails only when the directory itself cannot be listed; per-file
    /// problems are logged and skipped.
    pub fn read_all(&self) -> anyhow::Result<Vec<RawFix>> {
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read points directory {}", self.dir.display()))?;

        let mut csv_paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
            })
            .collect();
        csv_paths.sort();

        if csv_paths.is_empty() {
            warn!(dir = %self.dir.display(), "no_csv_batches_found");
        }

        let mut fixes = Vec::new();
        for path in csv_paths {
            match Self::read_file(&path) {
                Ok(mut batch) => {
                    debug!(file = %path.display(), rows = %batch.len(), "batch_read");
                    fixes.append(&mut batch);
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "batch_read_failed");
                }
            }
        }
        Ok(fixes)
    }

    fn read_file(path: &Path) -> anyhow::Result<Vec<RawFix>> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        let columns = ColumnMap::from_headers(reader.headers()?);
        let mut fixes = Vec::new();

        for record in reader.records() {
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    debug!(error = %e, "csv_row_unreadable");
                    fixes.push(RawFix::default());
                    continue;
                }
            };

            let field = |idx: Option<usize>| -> Option<&str> {
                idx.and_then(|i| record.get(i)).map(str::trim).filter(|s| !s.is_empty())
            };

            fixes.push(RawFix {
                time: field(columns.time).map(str::to_string),
                lat: field(columns.lat).and_then(|s| s.parse().ok()),
                lon: field(columns.lon).and_then(|s| s.parse().ok()),
                accuracy: field(columns.accuracy).and_then(|s| s.parse().ok()),
            });
        }

        Ok(fixes)
    }
}
