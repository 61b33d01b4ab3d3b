// src/roster.rs
//! Sponsor roster loading.
//!
//! Supported files:
//! - `.json`: `["Acme Corp", ...]` or exported rows `[{"Employer (Petitioner) Name": "Acme Corp", ...}]`
//! - `.toml`: `employers = ["Acme Corp", ...]`
//! - anything else: one name per line, `#` starts a comment line

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::RosterLoadError;
use crate::posting::ReferenceEntry;

pub const DEFAULT_ROSTER_PATH: &str = "data/sponsors.json";
pub const DEFAULT_ROSTER_COLUMN: &str = "Employer (Petitioner) Name";

pub trait RosterLoader: Send + Sync {
    fn load_roster(&self) -> Result<Vec<ReferenceEntry>, RosterLoadError>;
}

#[derive(Debug, Clone)]
pub struct FileRosterLoader {
    path: PathBuf,
    column: String,
}

impl FileRosterLoader {
    pub fn new(path: impl Into<PathBuf>, column: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            column: column.into(),
        }
    }

    fn load_inner(&self) -> Result<Vec<ReferenceEntry>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("reading roster from {}", self.path.display()))?;
        let names = match extension(&self.path).as_str() {
            "json" => parse_json(&content, &self.column)?,
            "toml" => parse_toml(&content)?,
            _ => parse_lines(&content),
        };
        let entries: Vec<ReferenceEntry> = names
            .into_iter()
            .filter_map(|n| {
                let t = n.trim();
                (!t.is_empty()).then(|| ReferenceEntry::new(t))
            })
            .collect();
        if entries.is_empty() {
            tracing::warn!(target: "roster", path = %self.path.display(), "roster has no employer names, nothing will match");
        }
        Ok(entries)
    }
}

impl RosterLoader for FileRosterLoader {
    fn load_roster(&self) -> Result<Vec<ReferenceEntry>, RosterLoadError> {
        let entries = self.load_inner()?;
        tracing::info!(target: "roster", path = %self.path.display(), entries = entries.len(), "roster loaded");
        Ok(entries)
    }
}

/// Fixed roster, for demos and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticRoster(pub Vec<ReferenceEntry>);

impl StaticRoster {
    pub fn from_names(names: &[&str]) -> Self {
        Self(names.iter().map(|n| ReferenceEntry::new(*n)).collect())
    }
}

impl RosterLoader for StaticRoster {
    fn load_roster(&self) -> Result<Vec<ReferenceEntry>, RosterLoadError> {
        Ok(self.0.clone())
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Rows without a usable name (missing, null, non-string) are dropped.
fn parse_json(s: &str, column: &str) -> Result<Vec<String>> {
    let rows: Vec<serde_json::Value> = serde_json::from_str(s).context("parsing roster json")?;
    Ok(rows
        .into_iter()
        .filter_map(|row| match row {
            serde_json::Value::String(name) => Some(name),
            serde_json::Value::Object(mut obj) => match obj.remove(column) {
                Some(serde_json::Value::String(name)) => Some(name),
                _ => None,
            },
            _ => None,
        })
        .collect())
}

fn parse_toml(s: &str) -> Result<Vec<String>> {
    #[derive(Deserialize)]
    struct TomlRoster {
        employers: Vec<String>,
    }
    let v: TomlRoster = toml::from_str(s).context("parsing roster toml")?;
    Ok(v.employers)
}

fn parse_lines(s: &str) -> Vec<String> {
    s.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}
