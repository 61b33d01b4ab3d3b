// src/ingest/providers/fixed.rs
use async_trait::async_trait;

use crate::error::FetchError;
use crate::ingest::types::{PostingFetcher, RawPosting};

/// In-memory fetcher, for demos and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    pub items: Vec<RawPosting>,
}

impl StaticFetcher {
    pub fn new(items: Vec<RawPosting>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl PostingFetcher for StaticFetcher {
    async fn fetch(&self) -> Result<Vec<RawPosting>, FetchError> {
        Ok(self.items.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Fetcher that always fails.
#[derive(Debug, Clone, Default)]
pub struct FailingFetcher;

#[async_trait]
impl PostingFetcher for FailingFetcher {
    async fn fetch(&self) -> Result<Vec<RawPosting>, FetchError> {
        Err(FetchError("listing unavailable".into()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}
