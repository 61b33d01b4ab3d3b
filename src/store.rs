// src/store.rs
//! Record store: the persisted list of postings plus the retention rule.

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::StoreCorruptError;
use crate::posting::PostingRecord;

pub const DEFAULT_DATABASE_PATH: &str = "data/database.json";

pub trait RecordStore: Send + Sync {
    /// Persisted records; empty when absent or corrupt.
    fn load(&self) -> Vec<PostingRecord>;
    /// Replace the persisted records.
    fn save(&self, records: &[PostingRecord]) -> Result<()>;
}

/// JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Like [`RecordStore::load`] but reports a corrupt document.
    /// A missing file is not an error.
    pub fn load_checked(&self) -> Result<Vec<PostingRecord>, StoreCorruptError> {
        let corrupt = |reason: String| StoreCorruptError {
            path: self.path.display().to_string(),
            reason,
        };

        let content = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(corrupt(format!("unreadable: {e}"))),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let doc: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| corrupt(format!("invalid json: {e}")))?;

        // A lone object is accepted as a one-record store.
        let items = match doc {
            serde_json::Value::Array(items) => items,
            obj @ serde_json::Value::Object(_) => vec![obj],
            other => return Err(corrupt(format!("expected a list, found {other}"))),
        };

        let mut out = Vec::with_capacity(items.len());
        for (idx, item) in items.into_iter().enumerate() {
            match serde_json::from_value::<PostingRecord>(item) {
                Ok(rec) => out.push(rec),
                Err(e) => {
                    tracing::warn!(target: "store", index = idx, error = %e, "skipping undecodable record");
                }
            }
        }
        Ok(out)
    }
}

impl RecordStore for JsonFileStore {
    fn load(&self) -> Vec<PostingRecord> {
        match self.load_checked() {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(target: "store", error = %e, "treating store as empty");
                Vec::new()
            }
        }
    }

    fn save(&self, records: &[PostingRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }

        let json = serde_json::to_string_pretty(records).context("serializing records")?;
        let mut tmp_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "database.json".into());
        tmp_name.push(".tmp");
        let tmp = self.path.with_file_name(tmp_name);

        fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        tracing::debug!(target: "store", path = %self.path.display(), count = records.len(), "records saved");
        Ok(())
    }
}

// --- Test helper ---
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub records: Mutex<Vec<PostingRecord>>,
    pub saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn new(records: Vec<PostingRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            saves: Mutex::new(0),
        }
    }

    pub fn snapshot(&self) -> Vec<PostingRecord> {
        self.records.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or_default()
    }
}

impl RecordStore for MemoryStore {
    fn load(&self) -> Vec<PostingRecord> {
        self.snapshot()
    }

    fn save(&self, records: &[PostingRecord]) -> Result<()> {
        let mut v = self
            .records
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        *v = records.to_vec();
        if let Ok(mut n) = self.saves.lock() {
            *n += 1;
        }
        Ok(())
    }
}

/// Keep records scraped at or after `now - window`. Returns the kept records
/// and the number evicted. A window reaching past the calendar keeps everything.
pub fn prune_expired(
    records: Vec<PostingRecord>,
    now: NaiveDateTime,
    window: Duration,
) -> (Vec<PostingRecord>, usize) {
    let Some(horizon) = now.checked_sub_signed(window) else {
        return (records, 0);
    };
    let before = records.len();
    let kept: Vec<PostingRecord> = records
        .into_iter()
        .filter(|r| r.scraped_at >= horizon)
        .collect();
    let evicted = before - kept.len();
    (kept, evicted)
}
