// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod error;
pub mod ingest;
pub mod matcher;
pub mod notify;
pub mod novelty;
pub mod posting;
pub mod roster;
pub mod store;
pub mod watcher;

// ---- Re-exports for stable public API ----
pub use crate::config::WatchConfig;
pub use crate::error::{
    FetchError, MatcherError, RosterLoadError, StoreCorruptError, TransportError, WatchError,
};
pub use crate::matcher::{Analyzer, MatcherParams, SimilarityMatcher};
pub use crate::notify::{NotificationGate, NotificationTransport};
pub use crate::posting::{MatchResult, NotifyState, PostingRecord, ReferenceEntry};
pub use crate::watcher::{RunReport, RunSummary, Watcher};
