// src/config/watch.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::KeywordFilter;
use crate::matcher::{Analyzer, MatcherParams, DEFAULT_NGRAM_MAX, DEFAULT_NGRAM_MIN, DEFAULT_THRESHOLD};
use crate::novelty::IdentityMatch;
use crate::roster::{DEFAULT_ROSTER_COLUMN, DEFAULT_ROSTER_PATH};
use crate::store::DEFAULT_DATABASE_PATH;

pub const ENV_CONFIG_PATH: &str = "SPONSOR_WATCH_CONFIG";
pub const ENV_SIMILARITY_THRESHOLD: &str = "SIMILARITY_THRESHOLD";
pub const ENV_RETENTION_SECS: &str = "RETENTION_SECS";

const FALLBACK_PATHS: [&str; 2] = ["config/watch.toml", "data/crawler.json"];

fn default_keywords() -> Vec<String> {
    [
        "python",
        "developer",
        "engineer",
        "data engineer",
        "airflow",
        "etl",
        "aws",
        "snowflake",
        "databricks",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_excluded() -> Vec<String> {
    ["5+ years", "4+ years", "manager", "director"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_database_file() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE_PATH)
}
fn default_postings_file() -> PathBuf {
    PathBuf::from("data/postings.json")
}
fn default_roster_file() -> PathBuf {
    PathBuf::from(DEFAULT_ROSTER_PATH)
}
fn default_roster_column() -> String {
    DEFAULT_ROSTER_COLUMN.to_string()
}
fn default_source_name() -> String {
    "LinkedIn".to_string()
}
fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}
fn default_retention_secs() -> u64 {
    3600
}
fn default_ngram_min() -> usize {
    DEFAULT_NGRAM_MIN
}
fn default_ngram_max() -> usize {
    DEFAULT_NGRAM_MAX
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Inclusion list; only applied when `require_keyword` is true.
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub require_keyword: bool,
    /// Case-insensitive substrings that reject a title.
    #[serde(default = "default_excluded")]
    pub excluded_keywords: Vec<String>,
    #[serde(default = "default_database_file")]
    pub database_file: PathBuf,
    /// Postings exported by the scraper (file path).
    #[serde(default = "default_postings_file")]
    pub postings_file: PathBuf,
    /// Optional HTTP endpoint serving the same JSON; wins over `postings_file`.
    #[serde(default)]
    pub postings_url: Option<String>,
    #[serde(default = "default_roster_file")]
    pub roster_file: PathBuf,
    #[serde(default = "default_roster_column")]
    pub roster_column: String,
    #[serde(default = "default_source_name")]
    pub source_name: String,
    #[serde(default = "default_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    #[serde(default = "default_ngram_min")]
    pub ngram_min: usize,
    #[serde(default = "default_ngram_max")]
    pub ngram_max: usize,
    #[serde(default)]
    pub analyzer: Analyzer,
    #[serde(default)]
    pub identity_match: IdentityMatch,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            require_keyword: false,
            excluded_keywords: default_excluded(),
            database_file: default_database_file(),
            postings_file: default_postings_file(),
            postings_url: None,
            roster_file: default_roster_file(),
            roster_column: default_roster_column(),
            source_name: default_source_name(),
            similarity_threshold: default_threshold(),
            retention_secs: default_retention_secs(),
            ngram_min: default_ngram_min(),
            ngram_max: default_ngram_max(),
            analyzer: Analyzer::default(),
            identity_match: IdentityMatch::default(),
        }
    }
}

impl WatchConfig {
    /// Load from an explicit path. TOML or JSON, chosen by extension.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut cfg = parse_config(&content, &ext)?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $SPONSOR_WATCH_CONFIG
    /// 2) config/watch.toml
    /// 3) data/crawler.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            match FALLBACK_PATHS.iter().map(PathBuf::from).find(|p| p.exists()) {
                Some(p) => Self::load_from(&p)?,
                None => Self::default(),
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Load `path`, or write the defaults there first when it does not exist.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load_from(path);
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        let cfg = Self::default();
        let json = serde_json::to_string_pretty(&cfg)?;
        fs::write(path, json).with_context(|| format!("writing default config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "default config written");
        Ok(cfg)
    }

    fn sanitize(&mut self) {
        if !self.similarity_threshold.is_finite() {
            self.similarity_threshold = default_threshold();
        }
        self.similarity_threshold = self.similarity_threshold.clamp(0.0, 1.0);
        if self.ngram_min == 0 {
            self.ngram_min = 1;
        }
        if self.ngram_min > self.ngram_max {
            // swap to keep a valid range
            std::mem::swap(&mut self.ngram_min, &mut self.ngram_max);
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Some(t) = parse_threshold_env(std::env::var(ENV_SIMILARITY_THRESHOLD).ok()) {
            self.similarity_threshold = t;
        }
        if let Some(secs) = std::env::var(ENV_RETENTION_SECS)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            self.retention_secs = secs;
        }
    }

    pub fn keyword_filter(&self) -> KeywordFilter {
        KeywordFilter {
            keywords: self.keywords.clone(),
            require_keyword: self.require_keyword,
            excluded: self.excluded_keywords.clone(),
        }
    }

    pub fn matcher_params(&self) -> MatcherParams {
        MatcherParams {
            threshold: self.similarity_threshold,
            ngram_min: self.ngram_min,
            ngram_max: self.ngram_max,
            analyzer: self.analyzer,
        }
    }

    pub fn retention(&self) -> chrono::Duration {
        i64::try_from(self.retention_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}

// parse optional float env and clamp to <0.0..=1.0>
fn parse_threshold_env(raw: Option<String>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0))
}

fn parse_config(s: &str, hint_ext: &str) -> Result<WatchConfig> {
    // Try the hinted format first, then the other one.
    let toml_first = hint_ext == "toml";
    if toml_first {
        if let Ok(v) = toml::from_str::<WatchConfig>(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = serde_json::from_str::<WatchConfig>(s) {
        return Ok(v);
    }
    if !toml_first {
        if let Ok(v) = toml::from_str::<WatchConfig>(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported config format"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = parse_config(
            r#"
similarity_threshold = 0.75
excluded_keywords = ["intern"]
identity_match = "normalized"
analyzer = "char_wb"
"#,
            "toml",
        )
        .unwrap();
        assert_eq!(cfg.similarity_threshold, 0.75);
        assert_eq!(cfg.excluded_keywords, vec!["intern".to_string()]);
        assert_eq!(cfg.identity_match, IdentityMatch::Normalized);
        assert_eq!(cfg.analyzer, Analyzer::CharWb);
        assert_eq!(cfg.retention_secs, 3600);
        assert_eq!((cfg.ngram_min, cfg.ngram_max), (2, 3));
    }

    #[test]
    fn crawler_json_with_unknown_keys_is_accepted() {
        let cfg = parse_config(
            r#"{"job_url": "https://example/jobs", "keywords": ["rust"], "request_delay": {"min_seconds": 2}}"#,
            "json",
        )
        .unwrap();
        assert_eq!(cfg.keywords, vec!["rust".to_string()]);
        assert!(!cfg.require_keyword);
    }

    #[test]
    fn sanitize_repairs_ranges() {
        let mut cfg = WatchConfig {
            similarity_threshold: 4.0,
            ngram_min: 5,
            ngram_max: 2,
            ..WatchConfig::default()
        };
        cfg.sanitize();
        assert_eq!(cfg.similarity_threshold, 1.0);
        assert_eq!((cfg.ngram_min, cfg.ngram_max), (2, 5));
    }

    #[test]
    fn load_or_init_writes_defaults_once() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("data/crawler.json");
        let first = WatchConfig::load_or_init(&p).unwrap();
        assert!(p.exists());
        assert_eq!(first, WatchConfig::default());
        fs::write(&p, r#"{"retention_secs": 120}"#).unwrap();
        let second = WatchConfig::load_or_init(&p).unwrap();
        assert_eq!(second.retention_secs, 120);
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks_then_overrides() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_SIMILARITY_THRESHOLD);
        env::remove_var(ENV_RETENTION_SECS);

        assert_eq!(WatchConfig::load_default().unwrap(), WatchConfig::default());

        fs::create_dir_all(tmp.path().join("config")).unwrap();
        fs::write(tmp.path().join("config/watch.toml"), "retention_secs = 600").unwrap();
        assert_eq!(WatchConfig::load_default().unwrap().retention_secs, 600);

        let p = tmp.path().join("custom.json");
        fs::write(&p, r#"{"retention_secs": 60}"#).unwrap();
        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        env::set_var(ENV_SIMILARITY_THRESHOLD, "1.7");
        let cfg = WatchConfig::load_default().unwrap();
        assert_eq!(cfg.retention_secs, 60);
        assert_eq!(cfg.similarity_threshold, 1.0);

        env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(WatchConfig::load_default().is_err());

        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_SIMILARITY_THRESHOLD);
        env::set_current_dir(&old).unwrap();
    }
}
