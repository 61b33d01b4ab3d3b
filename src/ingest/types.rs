// src/ingest/types.rs
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// A posting as handed over by an external scraper. Every field may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawPosting {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub date_posted: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[async_trait::async_trait]
pub trait PostingFetcher: Send + Sync {
    async fn fetch(&self) -> Result<Vec<RawPosting>, FetchError>;
    fn name(&self) -> &'static str;
}
