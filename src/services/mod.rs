//! Services - the algorithmic core of the stay pipeline
//!
//! This module contains the pipeline stages, in dependency order:
//! - `preprocessor` - filters and smooths raw fixes
//! - `stay_detector` - segments the smoothed stream into candidate stays
//! - `stay_merger` - coalesces adjacent stays at the same place
//! - `deduplicator` - suppresses stays already recorded
//! - `tag_resolver` - assigns category tags (learned mapping + rules)
//! - `route_summary` - per-day movement summaries
//! - `pipeline` - sequences the stages and drives the external resolver/sink

pub mod deduplicator;
pub mod pipeline;
pub mod preprocessor;
pub mod route_summary;
pub mod stay_detector;
pub mod stay_merger;
pub mod tag_resolver;

// Re-export commonly used types
pub use pipeline::{Pipeline, RunOutput};
