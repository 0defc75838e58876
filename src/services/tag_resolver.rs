//! Tag inference - learned mapping with a rule-based fallback
//!
//! Resolution order: exact hit in the learned tag memory, then the first
//! substring rule in configured order, then the default tag. A previously
//! confirmed tag always wins over rule matches.

use crate::domain::types::ExistingRecord;
use crate::infra::config::Config;
use rustc_hash::FxHashMap;
use tracing::debug;

/// Assigns category tags to resolved place names
pub struct TagResolver {
    /// Learned place name -> tag mapping, seeded from existing records
    memory: FxHashMap<String, String>,
    /// Ordered (keyword, tag) substring rules; first match wins
    rules: Vec<(String, String)>,
    default_tag: String,
}

impl TagResolver {
    pub fn new(rules: Vec<(String, String)>, default_tag: &str) -> Self {
        Self { memory: FxHashMap::default(), rules, default_tag: default_tag.to_string() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.tag_rules().to_vec(), config.default_tag())
    }

    /// Seed the tag memory from previously persisted records
    pub fn seed_from_existing(&mut self, records: &[ExistingRecord]) {
        for record in records {
            if let Some(tag) = &record.tag {
                self.memory.entry(record.place_name.clone()).or_insert_with(|| tag.clone());
            }
        }
        debug!(entries = %self.memory.len(), "tag_memory_seeded");
    }

    /// Return exactly one tag for a place name
    pub fn resolve(&self, place_name: &str) -> String {
        if let Some(tag) = self.memory.get(place_name) {
            return tag.clone();
        }
        for (keyword, tag) in &self.rules {
            if place_name.contains(keyword.as_str()) {
                return tag.clone();
            }
        }
        self.default_tag.clone()
    }

    /// Remember a newly confirmed tag for the rest of the run.
    /// The memory is append-only: an existing entry is never overwritten.
    pub fn learn(&mut self, place_name: &str, tag: &str) {
        self.memory.entry(place_name.to_string()).or_insert_with(|| tag.to_string());
    }
}
