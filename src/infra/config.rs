//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use crate::domain::PipelineError;
use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StoreConfig {
    /// Identity of the target record store (e.g., a database or notebook id).
    /// Required: an empty id is a fatal configuration error.
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PointsConfig {
    /// Directory scanned for point CSV batches
    #[serde(default = "default_points_dir")]
    pub dir: String,
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self { dir: default_points_dir() }
    }
}

fn default_points_dir() -> String {
    "points".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordsConfig {
    /// File path for persisted visits (JSONL format)
    #[serde(default = "default_records_file")]
    pub file: String,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self { file: default_records_file() }
    }
}

fn default_records_file() -> String {
    "visits.jsonl".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocoderConfig {
    #[serde(default = "default_geocoder_url")]
    pub url: String,
    /// Contact email sent with reverse-geocoding requests
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_geocoder_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            url: default_geocoder_url(),
            email: String::new(),
            timeout_ms: default_geocoder_timeout_ms(),
        }
    }
}

fn default_geocoder_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_geocoder_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    /// Fixes with accuracy above this (meters) are dropped; absent = keep all
    #[serde(default)]
    pub accuracy_limit: Option<f64>,
    /// Centered moving-average window (points); normalized to an odd
    /// value >= 1 on load
    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: usize,
    #[serde(default = "default_stay_radius_m")]
    pub stay_radius_m: f64,
    #[serde(default = "default_min_stay_minutes")]
    pub min_stay_minutes: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            accuracy_limit: None,
            smoothing_window: default_smoothing_window(),
            stay_radius_m: default_stay_radius_m(),
            min_stay_minutes: default_min_stay_minutes(),
        }
    }
}

fn default_smoothing_window() -> usize {
    3
}

fn default_stay_radius_m() -> f64 {
    50.0
}

fn default_min_stay_minutes() -> f64 {
    5.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct MergeConfig {
    #[serde(default = "default_merge_gap_minutes")]
    pub gap_minutes: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self { gap_minutes: default_merge_gap_minutes() }
    }
}

fn default_merge_gap_minutes() -> f64 {
    30.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct DedupConfig {
    /// Two stay starts closer than this (seconds) are the same event
    #[serde(default = "default_dedup_tolerance_secs")]
    pub tolerance_secs: i64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self { tolerance_secs: default_dedup_tolerance_secs() }
    }
}

fn default_dedup_tolerance_secs() -> i64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    /// Consecutive path points closer than this (meters) are collapsed
    #[serde(default = "default_min_move_distance_m")]
    pub min_move_distance_m: f64,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self { min_move_distance_m: default_min_move_distance_m() }
    }
}

fn default_min_move_distance_m() -> f64 {
    30.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagRuleEntry {
    pub keyword: String,
    pub tag: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagsConfig {
    #[serde(default = "default_tag")]
    pub default: String,
    /// Ordered substring rules; first match wins
    #[serde(default)]
    pub rules: Vec<TagRuleEntry>,
}

impl Default for TagsConfig {
    fn default() -> Self {
        Self { default: default_tag(), rules: Vec::new() }
    }
}

fn default_tag() -> String {
    "uncategorized".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub points: PointsConfig,
    #[serde(default)]
    pub records: RecordsConfig,
    #[serde(default)]
    pub geocoder: GeocoderConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub route: RouteConfig,
    #[serde(default)]
    pub tags: TagsConfig,
}

/// A centered moving average needs an odd window; even values are bumped
/// to the next odd size instead of silently behaving like one
fn normalize_window(window: usize) -> usize {
    let window = window.max(1);
    if window % 2 == 0 {
        window + 1
    } else {
        window
    }
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    store_id: String,
    points_dir: String,
    records_file: String,
    geocoder_url: String,
    geocoder_email: String,
    geocoder_timeout_ms: u64,
    accuracy_limit: Option<f64>,
    smoothing_window: usize,
    stay_radius_m: f64,
    min_stay_minutes: f64,
    merge_gap_minutes: f64,
    dedup_tolerance_secs: i64,
    min_move_distance_m: f64,
    default_tag: String,
    tag_rules: Vec<(String, String)>,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default")
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: &str) -> Self {
        Self {
            store_id: toml_config.store.id,
            points_dir: toml_config.points.dir,
            records_file: toml_config.records.file,
            geocoder_url: toml_config.geocoder.url,
            geocoder_email: toml_config.geocoder.email,
            geocoder_timeout_ms: toml_config.geocoder.timeout_ms,
            accuracy_limit: toml_config.detection.accuracy_limit,
            smoothing_window: normalize_window(toml_config.detection.smoothing_window),
            stay_radius_m: toml_config.detection.stay_radius_m,
            min_stay_minutes: toml_config.detection.min_stay_minutes,
            merge_gap_minutes: toml_config.merge.gap_minutes,
            dedup_tolerance_secs: toml_config.dedup.tolerance_secs,
            min_move_distance_m: toml_config.route.min_move_distance_m,
            default_tag: toml_config.tags.default,
            tag_rules: toml_config
                .tags
                .rules
                .into_iter()
                .map(|r| (r.keyword, r.tag))
                .collect(),
            config_file: config_file.to_string(),
        }
    }

    /// Determine config file path from args or environment
    pub fn resolve_config_path(args: &[String]) -> String {
        // Check for --config argument
        for (i, arg) in args.iter().enumerate() {
            if arg == "--config" {
                if let Some(path) = args.get(i + 1) {
                    return path.clone();
                }
            }
            if let Some(path) = arg.strip_prefix("--config=") {
                return path.to_string();
            }
        }

        // Check CONFIG_FILE environment variable
        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        // Default to dev.toml
        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, &path.display().to_string()))
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Reject configurations that cannot identify the target record store.
    /// Must be called before any processing begins.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.store_id.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "store.id is required but missing or empty".to_string(),
            ));
        }
        Ok(())
    }

    // Getters for all config fields
    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    pub fn points_dir(&self) -> &str {
        &self.points_dir
    }

    pub fn records_file(&self) -> &str {
        &self.records_file
    }

    pub fn geocoder_url(&self) -> &str {
        &self.geocoder_url
    }

    pub fn geocoder_email(&self) -> &str {
        &self.geocoder_email
    }

    pub fn geocoder_timeout_ms(&self) -> u64 {
        self.geocoder_timeout_ms
    }

    pub fn accuracy_limit(&self) -> Option<f64> {
        self.accuracy_limit
    }

    pub fn smoothing_window(&self) -> usize {
        self.smoothing_window
    }

    pub fn stay_radius_m(&self) -> f64 {
        self.stay_radius_m
    }

    pub fn min_stay_minutes(&self) -> f64 {
        self.min_stay_minutes
    }

    pub fn merge_gap_minutes(&self) -> f64 {
        self.merge_gap_minutes
    }

    pub fn dedup_tolerance_secs(&self) -> i64 {
        self.dedup_tolerance_secs
    }

    pub fn min_move_distance_m(&self) -> f64 {
        self.min_move_distance_m
    }

    pub fn default_tag(&self) -> &str {
        &self.default_tag
    }

    pub fn tag_rules(&self) -> &[(String, String)] {
        &self.tag_rules
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }
}
