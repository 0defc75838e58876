//! Error taxonomy for the stay pipeline
//!
//! Only configuration problems are fatal and therefore typed. Malformed
//! rows, resolution failures and store read/write failures are absorbed
//! where they occur and surface as log events and run-summary counters.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required identifier is absent; the run cannot proceed.
    #[error("configuration error: {0}")]
    Configuration(String),
}
