//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `point_source` - CSV batch reader for raw GPS fixes
//! - `records` - JSONL store for persisted visits (reader + sink)
//! - `geocoder` - reverse-geocoding place resolver
//!
//! The pipeline itself performs no IO; it receives points and talks to
//! these collaborators through narrow traits.

pub mod geocoder;
pub mod point_source;
pub mod records;

// Re-export commonly used types
pub use geocoder::{NominatimResolver, PlaceResolver};
pub use point_source::PointSource;
pub use records::{RecordStore, VisitSink};
