//! Infrastructure - configuration and run statistics
//!
//! This module contains infrastructure concerns:
//! - `config` - Application configuration (TOML loading, defaults, validation)
//! - `stats` - Per-run counters and the logged run summary

pub mod config;
pub mod stats;

// Re-export commonly used types
pub use config::Config;
pub use stats::{RunStats, RunSummary};
