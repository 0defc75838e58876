//! Stay merging - coalesces adjacent stays at the same place
//!
//! Two passes share the same gap rule. The place-key pass runs before
//! geocoding; the resolved pass runs after place names are known and
//! additionally matches on name equality or a shared address prefix.
//!
//! Merging keeps the earlier event's start and centroid unchanged and only
//! extends its end; it is a single left-to-right pass comparing each
//! candidate to the most recently kept event, so it is not transitive
//! across a broken chain.

use crate::domain::types::{minutes_between, StayEvent, VisitRecord};
use crate::infra::config::Config;
use tracing::debug;

/// Number of leading comma-separated address components that must agree
/// for two resolved addresses to count as the same place
const ADDRESS_PREFIX_COMPONENTS: usize = 2;

/// Coalesces adjacent stays separated by a small gap
pub struct StayMerger {
    merge_gap_minutes: f64,
}

impl StayMerger {
    pub fn new(merge_gap_minutes: f64) -> Self {
        Self { merge_gap_minutes }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.merge_gap_minutes())
    }

    /// Pre-resolution pass: merge on place-key equality
    pub fn merge_by_key(&self, stays: Vec<StayEvent>) -> Vec<StayEvent> {
        let mut kept: Vec<StayEvent> = Vec::with_capacity(stays.len());

        for stay in stays {
            if let Some(last) = kept.last_mut() {
                let gap = minutes_between(last.end, stay.start);
                if last.place_key == stay.place_key && gap <= self.merge_gap_minutes {
                    debug!(
                        place_key = %last.place_key,
                        gap_minutes = %gap,
                        merged_end = %stay.end,
                        "stays_merged_by_key"
                    );
                    last.extend_to(stay.end);
                    continue;
                }
            }
            kept.push(stay);
        }

        kept
    }

    /// Post-resolution pass: merge on place key, resolved name, or address
    /// prefix. Returns the kept records and the indices of records that
    /// absorbed a neighbor (their tags must be re-resolved).
    pub fn merge_resolved(&self, visits: Vec<VisitRecord>) -> (Vec<VisitRecord>, Vec<usize>) {
        let mut kept: Vec<VisitRecord> = Vec::with_capacity(visits.len());
        let mut touched: Vec<usize> = Vec::new();

        for visit in visits {
            if let Some(last) = kept.last_mut() {
                let gap = minutes_between(last.end, visit.start);
                if same_resolved_place(last, &visit) && gap <= self.merge_gap_minutes {
                    debug!(
                        place_name = %last.place_name,
                        gap_minutes = %gap,
                        merged_end = %visit.end,
                        "visits_merged_resolved"
                    );
                    last.extend_to(visit.end);
                    let idx = kept.len() - 1;
                    if touched.last() != Some(&idx) {
                        touched.push(idx);
                    }
                    continue;
                }
            }
            kept.push(visit);
        }

        (kept, touched)
    }
}

/// Place identity once names are known: equal place key, equal resolved
/// name, or addresses agreeing on a stable leading prefix. The unresolved
/// sentinel never establishes identity on its own.
fn same_resolved_place(a: &VisitRecord, b: &VisitRecord) -> bool {
    if a.place_key == b.place_key {
        return true;
    }
    if a.place_name == "unresolved" || b.place_name == "unresolved" {
        return false;
    }
    if a.place_name == b.place_name {
        return true;
    }
    address_prefix_matches(&a.address, &b.address)
}

fn address_prefix_matches(a: &str, b: &str) -> bool {
    let lead = |s: &str| -> Vec<String> {
        s.split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .take(ADDRESS_PREFIX_COMPONENTS)
            .collect()
    };
    let pa = lead(a);
    let pb = lead(b);
    pa.len() == ADDRESS_PREFIX_COMPONENTS && pa == pb
}
