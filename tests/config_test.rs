//! Integration tests for configuration loading

use staylog::infra::Config;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[store]
id = "test-journal"

[points]
dir = "/data/points"

[records]
file = "/data/visits.jsonl"

[geocoder]
url = "https://geo.example.test/"
email = "dev@example.test"
timeout_ms = 2500

[detection]
accuracy_limit = 35.0
smoothing_window = 5
stay_radius_m = 80.0
min_stay_minutes = 10.0

[merge]
gap_minutes = 20.0

[dedup]
tolerance_secs = 600

[route]
min_move_distance_m = 25.0

[tags]
default = "other"

[[tags.rules]]
keyword = "스타벅스"
tag = "☕ Cafe"

[[tags.rules]]
keyword = "강남"
tag = "🚆 Station"
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.store_id(), "test-journal");
    assert_eq!(config.points_dir(), "/data/points");
    assert_eq!(config.records_file(), "/data/visits.jsonl");
    assert_eq!(config.geocoder_email(), "dev@example.test");
    assert_eq!(config.geocoder_timeout_ms(), 2500);
    assert_eq!(config.accuracy_limit(), Some(35.0));
    assert_eq!(config.smoothing_window(), 5);
    assert_eq!(config.stay_radius_m(), 80.0);
    assert_eq!(config.min_stay_minutes(), 10.0);
    assert_eq!(config.merge_gap_minutes(), 20.0);
    assert_eq!(config.dedup_tolerance_secs(), 600);
    assert_eq!(config.min_move_distance_m(), 25.0);
    assert_eq!(config.default_tag(), "other");
    assert_eq!(config.tag_rules().len(), 2);
    // Declaration order is the resolution order
    assert_eq!(config.tag_rules()[0], ("스타벅스".to_string(), "☕ Cafe".to_string()));
    assert_eq!(config.tag_rules()[1], ("강남".to_string(), "🚆 Station".to_string()));
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_config_uses_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[store]\nid = \"partial\"\n").unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.store_id(), "partial");
    assert_eq!(config.smoothing_window(), 3);
    assert_eq!(config.stay_radius_m(), 50.0);
    assert_eq!(config.min_stay_minutes(), 5.0);
    assert_eq!(config.merge_gap_minutes(), 30.0);
    assert_eq!(config.dedup_tolerance_secs(), 300);
    assert_eq!(config.default_tag(), "uncategorized");
    assert!(config.tag_rules().is_empty());
    assert!(config.accuracy_limit().is_none());
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.points_dir(), "points");
    assert_eq!(config.records_file(), "visits.jsonl");
    assert_eq!(config.dedup_tolerance_secs(), 300);
}

#[test]
fn test_missing_store_id_is_fatal() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[detection]\nstay_radius_m = 40.0\n").unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("store.id"));
}
