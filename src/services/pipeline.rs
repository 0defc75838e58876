//! Pipeline orchestration
//!
//! Sequences the stages over one complete point batch:
//! raw fixes -> smoothed points -> candidate stays -> merged stays ->
//! deduplicated stays -> (place lookup, tag lookup) -> visit records.
//!
//! Processing is strictly ordered and single-threaded; the only blocking
//! operations are the external resolver calls, bounded to at most one per
//! distinct place key per run by the in-run place cache.

use crate::domain::types::{DaySummary, ExistingRecord, PlaceKey, RawFix, ResolvedPlace, VisitRecord};
use crate::infra::config::Config;
use crate::infra::stats::{RunStats, RunSummary};
use crate::io::{PlaceResolver, VisitSink};
use crate::services::deduplicator::Deduplicator;
use crate::services::preprocessor::Preprocessor;
use crate::services::route_summary::RouteSummarizer;
use crate::services::stay_detector::StayDetector;
use crate::services::stay_merger::StayMerger;
use crate::services::tag_resolver::TagResolver;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Everything one run produces
pub struct RunOutput {
    pub visits: Vec<VisitRecord>,
    pub summaries: Vec<DaySummary>,
    pub summary: RunSummary,
}

/// Sequences the pipeline stages and drives the external resolver and sink
pub struct Pipeline {
    preprocessor: Preprocessor,
    detector: StayDetector,
    merger: StayMerger,
    summarizer: RouteSummarizer,
    config: Config,
    stats: Arc<RunStats>,
}

impl Pipeline {
    pub fn new(config: Config, stats: Arc<RunStats>) -> Self {
        Self {
            preprocessor: Preprocessor::from_config(&config),
            detector: StayDetector::from_config(&config),
            merger: StayMerger::from_config(&config),
            summarizer: RouteSummarizer::from_config(&config),
            config,
            stats,
        }
    }

    /// Process one complete batch of raw fixes against the existing records.
    ///
    /// Best effort: malformed rows, resolution failures and per-record sink
    /// failures are absorbed and counted; the run always completes.
    pub async fn run(
        &self,
        fixes: &[RawFix],
        existing: &[ExistingRecord],
        resolver: &dyn PlaceResolver,
        sink: &mut dyn VisitSink,
    ) -> RunOutput {
        let mut dedup = Deduplicator::from_config(&self.config);
        dedup.seed_from_existing(existing);
        let mut tags = TagResolver::from_config(&self.config);
        tags.seed_from_existing(existing);

        self.stats.record_rows_read(fixes.len() as u64);
        let points = self.preprocessor.process(fixes, &self.stats);
        debug!(points = %points.len(), "points_preprocessed");

        let stays = self.merger.merge_by_key(self.detector.detect(&points));
        self.stats.record_stays_detected(stays.len() as u64);
        info!(candidates = %stays.len(), "stays_detected");

        let mut place_cache: FxHashMap<PlaceKey, ResolvedPlace> = FxHashMap::default();
        let mut visits: Vec<VisitRecord> = Vec::new();

        for stay in stays {
            if dedup.is_duplicate(stay.start) {
                self.stats.record_deduplicated();
                debug!(start = %stay.start, place_key = %stay.place_key, "dedup_suppressed");
                continue;
            }

            let place = match place_cache.get(&stay.place_key) {
                Some(place) => place.clone(),
                None => {
                    let place = match resolver
                        .resolve(stay.centroid_lat, stay.centroid_lon)
                        .await
                    {
                        Ok(place) => place,
                        Err(e) => {
                            warn!(place_key = %stay.place_key, error = %e, "resolve_failed");
                            self.stats.record_resolve_fallback();
                            ResolvedPlace::unresolved()
                        }
                    };
                    // Failures are cached too: the call budget is one per
                    // place key, successful or not
                    place_cache.insert(stay.place_key.clone(), place.clone());
                    place
                }
            };

            let tag = tags.resolve(&place.name);
            let visit = VisitRecord::from_stay(&stay, &place, &tag);
            dedup.register(visit.start);
            if place.name != "unresolved" {
                tags.learn(&place.name, &tag);
            }
            info!(
                start = %visit.start,
                place_name = %visit.place_name,
                tag = %visit.tag,
                duration_minutes = %visit.duration_minutes,
                "visit_created"
            );
            visits.push(visit);
        }

        // Second merge pass on resolved identity; only merged records get
        // their tag re-resolved and start re-registered
        let (mut visits, touched) = self.merger.merge_resolved(visits);
        for idx in touched {
            self.stats.record_merged_resolved();
            let visit = &mut visits[idx];
            visit.tag = tags.resolve(&visit.place_name);
            dedup.register(visit.start);
            debug!(place_name = %visit.place_name, end = %visit.end, "visit_remerged");
        }

        for visit in &visits {
            match sink.append(visit) {
                Ok(()) => self.stats.record_emitted(),
                Err(e) => {
                    error!(id = %visit.id, error = %e, "visit_sink_failed");
                    self.stats.record_sink_failure();
                }
            }
        }

        let summaries = self.summarizer.summarize(&points, &visits);

        RunOutput { visits, summaries, summary: self.stats.report() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn fix(time: &str, lat: f64, lon: f64) -> RawFix {
        RawFix { time: Some(time.to_string()), lat: Some(lat), lon: Some(lon), accuracy: None }
    }

    fn test_config() -> Config {
        // Defaults: window 3, radius 50m, min stay 5min, merge gap 30min,
        // dedup tolerance 300s
        Config::default()
    }

    /// Returns a fixed place per rounded coordinate; counts calls
    struct StubResolver {
        calls: AtomicU64,
        fail: bool,
    }

    impl StubResolver {
        fn new() -> Self {
            Self { calls: AtomicU64::new(0), fail: false }
        }

        fn failing() -> Self {
            Self { calls: AtomicU64::new(0), fail: true }
        }

        fn call_count(&self) -> u64 {
            self.calls.load(Ordering::Relaxed)
        }
    }

    #[async_trait]
    impl PlaceResolver for StubResolver {
        async fn resolve(&self, lat: f64, lon: f64) -> anyhow::Result<ResolvedPlace> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if self.fail {
                anyhow::bail!("resolver unreachable");
            }
            Ok(ResolvedPlace {
                name: format!("place@{:.2},{:.2}", lat, lon),
                address: format!("{:.2}, {:.2}, Testville", lat, lon),
            })
        }
    }

    #[derive(Default)]
    struct MemorySink {
        visits: Vec<VisitRecord>,
        fail_first: bool,
    }

    impl VisitSink for MemorySink {
        fn append(&mut self, visit: &VisitRecord) -> anyhow::Result<()> {
            if self.fail_first {
                self.fail_first = false;
                anyhow::bail!("disk full");
            }
            self.visits.push(visit.clone());
            Ok(())
        }
    }

    /// A stationary 20-minute trace at one spot
    fn stay_trace(day: &str, start_hour: u32, lat: f64, lon: f64) -> Vec<RawFix> {
        (0..3)
            .map(|i| {
                fix(&format!("{} {:02}:{:02}:00", day, start_hour, i * 10), lat, lon)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_end_to_end_emits_visit() {
        let fixes = stay_trace("2025-01-01", 10, 37.5, 127.0);
        let resolver = StubResolver::new();
        let mut sink = MemorySink::default();
        let pipeline = Pipeline::new(test_config(), Arc::new(RunStats::new()));

        let output = pipeline.run(&fixes, &[], &resolver, &mut sink).await;

        assert_eq!(output.visits.len(), 1);
        assert_eq!(sink.visits.len(), 1);
        assert_eq!(output.summary.emitted, 1);
        assert_eq!(output.visits[0].duration_minutes, 20.0);
        assert!(output.visits[0].place_name.starts_with("place@"));
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_valid_run() {
        let resolver = StubResolver::new();
        let mut sink = MemorySink::default();
        let pipeline = Pipeline::new(test_config(), Arc::new(RunStats::new()));

        let output = pipeline.run(&[], &[], &resolver, &mut sink).await;

        assert!(output.visits.is_empty());
        assert_eq!(output.summary.emitted, 0);
        assert_eq!(resolver.call_count(), 0);
    }

    #[tokio::test]
    async fn test_place_cache_bounds_resolver_calls() {
        // Two stays at the same spot separated by an excursion; smoothing is
        // disabled so the lone excursion point does not bleed into its
        // neighbors, and the gap is too long for merging, so both stays
        // reach the resolver stage
        let content = "[store]\nid = \"test\"\n\n[detection]\nsmoothing_window = 1\n";
        let mut f = tempfile::NamedTempFile::new().unwrap();
        {
            use std::io::Write;
            f.write_all(content.as_bytes()).unwrap();
        }
        let config = Config::load_from_path(f.path().to_str().unwrap());

        let mut fixes = stay_trace("2025-01-01", 10, 37.5, 127.0);
        fixes.push(fix("2025-01-01 10:40:00", 37.6, 127.1));
        fixes.extend(stay_trace("2025-01-01", 12, 37.5, 127.0));

        let resolver = StubResolver::new();
        let mut sink = MemorySink::default();
        let pipeline = Pipeline::new(config, Arc::new(RunStats::new()));

        let output = pipeline.run(&fixes, &[], &resolver, &mut sink).await;

        // The 100-minute gap is too long for either merge pass
        assert_eq!(output.visits.len(), 2);
        assert_eq!(resolver.call_count(), 1, "one call per distinct place key");
    }

    #[tokio::test]
    async fn test_resolution_failure_degrades_to_fallback() {
        let fixes = stay_trace("2025-01-01", 10, 37.5, 127.0);
        let resolver = StubResolver::failing();
        let mut sink = MemorySink::default();
        let pipeline = Pipeline::new(test_config(), Arc::new(RunStats::new()));

        let output = pipeline.run(&fixes, &[], &resolver, &mut sink).await;

        assert_eq!(output.visits.len(), 1);
        assert_eq!(output.visits[0].place_name, "unresolved");
        assert_eq!(output.visits[0].tag, "uncategorized");
        assert_eq!(output.summary.resolve_fallbacks, 1);
        assert_eq!(output.summary.emitted, 1);
    }

    #[tokio::test]
    async fn test_existing_record_suppresses_candidate() {
        let fixes = stay_trace("2025-01-01", 10, 37.5, 127.0);
        let existing = vec![ExistingRecord {
            start: chrono::NaiveDateTime::parse_from_str("2025-01-01 10:03:00", "%Y-%m-%d %H:%M:%S").unwrap(),
            end: chrono::NaiveDateTime::parse_from_str("2025-01-01 10:30:00", "%Y-%m-%d %H:%M:%S").unwrap(),
            place_name: "somewhere else entirely".to_string(),
            tag: None,
        }];

        let resolver = StubResolver::new();
        let mut sink = MemorySink::default();
        let pipeline = Pipeline::new(test_config(), Arc::new(RunStats::new()));

        let output = pipeline.run(&fixes, &existing, &resolver, &mut sink).await;

        assert!(output.visits.is_empty());
        assert_eq!(output.summary.deduplicated, 1);
        assert_eq!(resolver.call_count(), 0, "suppressed candidates get no lookup");
    }

    #[tokio::test]
    async fn test_idempotence_against_grown_record_set() {
        let fixes = stay_trace("2025-01-01", 10, 37.5, 127.0);
        let resolver = StubResolver::new();
        let pipeline = Pipeline::new(test_config(), Arc::new(RunStats::new()));

        let mut sink = MemorySink::default();
        let first = pipeline.run(&fixes, &[], &resolver, &mut sink).await;
        assert_eq!(first.visits.len(), 1);

        // Feed the first run's output back as the existing set
        let existing: Vec<ExistingRecord> = first
            .visits
            .iter()
            .map(|v| ExistingRecord {
                start: v.start,
                end: v.end,
                place_name: v.place_name.clone(),
                tag: Some(v.tag.clone()),
            })
            .collect();

        let pipeline2 = Pipeline::new(test_config(), Arc::new(RunStats::new()));
        let mut sink2 = MemorySink::default();
        let second = pipeline2.run(&fixes, &existing, &resolver, &mut sink2).await;

        assert!(second.visits.is_empty(), "second run emits nothing");
        assert_eq!(second.summary.deduplicated, 1);
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_stop_the_run() {
        // Two distinct stays far apart in space and time
        let mut fixes = stay_trace("2025-01-01", 10, 37.5, 127.0);
        fixes.extend(stay_trace("2025-01-01", 14, 38.5, 128.0));

        let resolver = StubResolver::new();
        let mut sink = MemorySink { visits: Vec::new(), fail_first: true };
        let pipeline = Pipeline::new(test_config(), Arc::new(RunStats::new()));

        let output = pipeline.run(&fixes, &[], &resolver, &mut sink).await;

        assert_eq!(output.visits.len(), 2);
        assert_eq!(output.summary.sink_failures, 1);
        assert_eq!(output.summary.emitted, 1);
        assert_eq!(sink.visits.len(), 1);
    }

    #[tokio::test]
    async fn test_tag_memory_wins_over_rules_end_to_end() {
        // A rule that would match the stub's place name, plus an existing
        // record that pins a learned tag for it; the learned tag must win
        let content = r#"
[store]
id = "test"

[[tags.rules]]
keyword = "place@"
tag = "rule-tag"
"#;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        {
            use std::io::Write;
            f.write_all(content.as_bytes()).unwrap();
        }
        let config = Config::load_from_path(f.path().to_str().unwrap());

        let fixes = stay_trace("2025-01-02", 10, 37.5, 127.0);
        let resolver = StubResolver::new();
        // Learned association for the exact name the stub will produce
        let existing = vec![ExistingRecord {
            start: chrono::NaiveDateTime::parse_from_str("2025-01-01 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap(),
            end: chrono::NaiveDateTime::parse_from_str("2025-01-01 11:00:00", "%Y-%m-%d %H:%M:%S").unwrap(),
            place_name: "place@37.50,127.00".to_string(),
            tag: Some("learned-tag".to_string()),
        }];

        let mut sink = MemorySink::default();
        let pipeline = Pipeline::new(config, Arc::new(RunStats::new()));
        let output = pipeline.run(&fixes, &existing, &resolver, &mut sink).await;

        assert_eq!(output.visits.len(), 1);
        assert_eq!(output.visits[0].tag, "learned-tag");
    }

    #[tokio::test]
    async fn test_day_summary_produced_for_travel() {
        // Morning stay, long hop, afternoon stay
        let mut fixes = stay_trace("2025-01-01", 9, 37.50, 127.0);
        fixes.push(fix("2025-01-01 11:00:00", 37.55, 127.05));
        fixes.extend(stay_trace("2025-01-01", 13, 37.60, 127.10));

        let resolver = StubResolver::new();
        let mut sink = MemorySink::default();
        let pipeline = Pipeline::new(test_config(), Arc::new(RunStats::new()));

        let output = pipeline.run(&fixes, &[], &resolver, &mut sink).await;

        assert_eq!(output.summaries.len(), 1);
        let day = &output.summaries[0];
        assert!(day.distance_km > 10.0);
        assert_eq!(day.places.len(), output.visits.len());
    }
}
