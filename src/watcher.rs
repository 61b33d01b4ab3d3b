// src/watcher.rs
//! # Watcher
//! One batch run: roster, store, fetch, novelty, retention, matching, notification, persist.
//!
//! The store is written exactly once, at the end of the run, so an interrupted
//! run leaves the previous state untouched. A roster failure aborts before any
//! write.

use chrono::NaiveDateTime;
use metrics::{counter, gauge};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::config::WatchConfig;
use crate::error::{MatcherError, WatchError};
use crate::ingest::providers::json_feed::JsonFeedFetcher;
use crate::ingest::types::PostingFetcher;
use crate::ingest::{ensure_metrics_described, fetch_postings, normalize_filter_dedup, KeywordFilter};
use crate::matcher::SimilarityMatcher;
use crate::notify::{NotificationGate, NotificationTransport};
use crate::novelty::IdentityMatch;
use crate::posting::{MatchResult, PostingRecord};
use crate::roster::{FileRosterLoader, RosterLoader};
use crate::store::{prune_expired, JsonFileStore, RecordStore};

/// Counts reported after every run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub fetched: usize,
    pub dropped: usize,
    pub filtered: usize,
    pub new: usize,
    pub evicted: usize,
    pub pending: usize,
    pub matched: usize,
    pub skipped: usize,
    pub notified: usize,
    pub delivered: bool,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fetched={} new={} matched={} notified={} (filtered={} dropped={} evicted={} pending={} skipped={})",
            self.fetched,
            self.new,
            self.matched,
            self.notified,
            self.filtered,
            self.dropped,
            self.evicted,
            self.pending,
            self.skipped
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub summary: RunSummary,
    pub new_postings: Vec<PostingRecord>,
    pub matches: Vec<MatchResult>,
}

pub struct Watcher {
    fetcher: Arc<dyn PostingFetcher>,
    roster: Arc<dyn RosterLoader>,
    store: Arc<dyn RecordStore>,
    gate: NotificationGate,
    matcher: SimilarityMatcher,
    filter: KeywordFilter,
    identity: IdentityMatch,
    retention: chrono::Duration,
    source_name: String,
}

impl Watcher {
    pub fn new(
        cfg: &WatchConfig,
        fetcher: Arc<dyn PostingFetcher>,
        roster: Arc<dyn RosterLoader>,
        store: Arc<dyn RecordStore>,
        transport: Arc<dyn NotificationTransport>,
    ) -> Result<Self, MatcherError> {
        Ok(Self {
            fetcher,
            roster,
            store,
            gate: NotificationGate::new(transport),
            matcher: SimilarityMatcher::new(cfg.matcher_params())?,
            filter: cfg.keyword_filter(),
            identity: cfg.identity_match,
            retention: cfg.retention(),
            source_name: cfg.source_name.clone(),
        })
    }

    /// File-backed collaborators as named by the config.
    pub fn from_config(
        cfg: &WatchConfig,
        transport: Arc<dyn NotificationTransport>,
    ) -> Result<Self, MatcherError> {
        let fetcher: Arc<dyn PostingFetcher> = match &cfg.postings_url {
            Some(url) => Arc::new(JsonFeedFetcher::from_url(url.clone())),
            None => Arc::new(JsonFeedFetcher::from_file(&cfg.postings_file)),
        };
        Self::new(
            cfg,
            fetcher,
            Arc::new(FileRosterLoader::new(&cfg.roster_file, cfg.roster_column.clone())),
            Arc::new(JsonFileStore::new(&cfg.database_file)),
            transport,
        )
    }

    pub async fn run_once(&self, now: NaiveDateTime) -> Result<RunReport, WatchError> {
        ensure_metrics_described();

        let roster = self.roster.load_roster().map_err(|e| {
            tracing::error!(error = %e, "no roster, aborting run");
            e
        })?;

        let previous = self.store.load();

        let raw = fetch_postings(self.fetcher.as_ref()).await;
        let fetched = raw.len();
        // Novelty sees every loaded record, expired ones included.
        let batch = normalize_filter_dedup(
            now,
            raw,
            &previous,
            &self.filter,
            &self.source_name,
            self.identity,
        );

        let (mut working, evicted) = prune_expired(previous, now, self.retention);
        working.extend(batch.new.iter().cloned());

        let pending = working.iter().filter(|r| !r.is_notified()).count();
        let (matches, skipped) = self.gate.pending_matches(&working, &self.matcher, &roster);
        let notified = if matches.is_empty() {
            0
        } else {
            self.gate.deliver(&mut working, &matches).await
        };

        self.store.save(&working).map_err(WatchError::Persist)?;

        let summary = RunSummary {
            fetched,
            dropped: batch.dropped,
            filtered: batch.filtered,
            new: batch.new.len(),
            evicted,
            pending,
            matched: matches.len(),
            skipped,
            notified,
            delivered: notified > 0,
        };

        counter!("watch_new_total").increment(summary.new as u64);
        counter!("watch_matched_total").increment(summary.matched as u64);
        gauge!("watch_last_run_ts").set(now.and_utc().timestamp() as f64);
        tracing::info!(
            fetched = summary.fetched,
            new = summary.new,
            matched = summary.matched,
            notified = summary.notified,
            transport = self.gate.transport_name(),
            "run finished"
        );

        Ok(RunReport {
            summary,
            new_postings: batch.new,
            matches,
        })
    }
}
