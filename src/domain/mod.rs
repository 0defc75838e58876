//! Domain models - core types of the stay pipeline
//!
//! This module contains the canonical data types used throughout the system:
//! - `RawFix` - a point record as read from a CSV batch
//! - `GpsPoint` - a filtered, smoothed fix
//! - `StayEvent` - a detected stationary cluster
//! - `VisitRecord` - the finalized, place-annotated unit the pipeline emits
//! - `ExistingRecord` - a previously persisted visit (dedup / tag memory input)
//! - `geo` - haversine distance, centroids, place keys

pub mod error;
pub mod geo;
pub mod types;

pub use error::PipelineError;
