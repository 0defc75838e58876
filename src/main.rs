//! Staylog - GPS stay detection and visit journaling
//!
//! Derives deduplicated "stay" events from noisy GPS fixes, annotates them
//! with resolved place names and category tags, and persists them as visit
//! records alongside per-day movement summaries.
//!
//! Module structure:
//! - `domain/` - Core types (GpsPoint, StayEvent, VisitRecord, geo helpers)
//! - `io/` - External interfaces (CSV point source, JSONL store, geocoder)
//! - `services/` - Pipeline stages (preprocess, detect, merge, dedup, tag)
//! - `infra/` - Infrastructure (Config, RunStats)

use clap::Parser;
use staylog::infra::{Config, RunStats};
use staylog::io::{NominatimResolver, PointSource, RecordStore};
use staylog::services::Pipeline;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Staylog - stay detection and visit journaling pipeline
#[derive(Parser, Debug)]
#[command(name = "staylog", version, about)]
struct Args {
    /// Path to TOML configuration file (falls back to the CONFIG_FILE
    /// environment variable, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for full event visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!("staylog starting");

    let args = Args::parse();
    let config_path = args
        .config
        .unwrap_or_else(|| Config::resolve_config_path(&std::env::args().collect::<Vec<_>>()));
    let config = Config::load_from_path(&config_path);

    // A run without a target store identity cannot proceed
    config.validate()?;

    info!(
        config_file = %config.config_file(),
        store_id = %config.store_id(),
        points_dir = %config.points_dir(),
        records_file = %config.records_file(),
        smoothing_window = %config.smoothing_window(),
        stay_radius_m = %config.stay_radius_m(),
        min_stay_minutes = %config.min_stay_minutes(),
        merge_gap_minutes = %config.merge_gap_minutes(),
        dedup_tolerance_secs = %config.dedup_tolerance_secs(),
        "config_loaded"
    );

    let stats = Arc::new(RunStats::new());

    let source = PointSource::new(config.points_dir());
    let fixes = source.read_all()?;
    info!(rows = %fixes.len(), "points_read");

    let mut store = RecordStore::new(config.records_file());
    let existing = store.read_existing();
    info!(existing = %existing.len(), "existing_records_loaded");

    let resolver = NominatimResolver::new(&config)?;
    let pipeline = Pipeline::new(config, stats);

    let output = pipeline.run(&fixes, &existing, &resolver, &mut store).await;

    for day in &output.summaries {
        info!(
            date = %day.date,
            distance_km = %format!("{:.2}", day.distance_km),
            duration_minutes = %day.duration_minutes,
            places = ?day.places,
            route = %day.route,
            "day_summary"
        );
    }

    output.summary.log();
    info!("staylog run complete");
    Ok(())
}
