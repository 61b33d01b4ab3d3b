// src/error.rs
//! Error taxonomy for a watch run.
//!
//! Every collaborator failure has its own type so the runner can decide locally
//! whether it is recoverable. Adapters build these from `anyhow` chains.

use thiserror::Error;

/// The posting fetcher failed. Recoverable: the run continues with no candidates.
#[derive(Debug, Error)]
#[error("fetch failed: {0}")]
pub struct FetchError(pub String);

/// The persisted store could not be decoded. Recoverable: treated as an empty store.
#[derive(Debug, Error)]
#[error("record store at {path} is corrupt: {reason}")]
pub struct StoreCorruptError {
    pub path: String,
    pub reason: String,
}

/// The sponsor roster could not be loaded. Fatal for the run.
#[derive(Debug, Error)]
#[error("roster load failed: {0}")]
pub struct RosterLoadError(pub String);

/// Malformed matcher input. Fatal only for the single comparison.
#[derive(Debug, Error, PartialEq)]
pub enum MatcherError {
    #[error("query is blank")]
    BlankQuery,

    #[error("query {0:?} yields no n-grams in range")]
    NoNgrams(String),

    #[error("invalid n-gram range {min}..={max}")]
    InvalidRange { min: usize, max: usize },
}

/// The notification transport did not deliver. Recoverable: retried next run.
#[derive(Debug, Error)]
#[error("transport failed: {0}")]
pub struct TransportError(pub String);

impl From<anyhow::Error> for TransportError {
    fn from(e: anyhow::Error) -> Self {
        Self(format!("{e:#}"))
    }
}

impl From<anyhow::Error> for FetchError {
    fn from(e: anyhow::Error) -> Self {
        Self(format!("{e:#}"))
    }
}

impl From<anyhow::Error> for RosterLoadError {
    fn from(e: anyhow::Error) -> Self {
        Self(format!("{e:#}"))
    }
}

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Roster(#[from] RosterLoadError),

    #[error("persisting records failed: {0:#}")]
    Persist(anyhow::Error),
}
