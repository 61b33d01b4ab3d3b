// src/ingest/providers/json_feed.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use std::path::PathBuf;

use crate::error::FetchError;
use crate::ingest::types::{PostingFetcher, RawPosting};

enum Mode {
    File(PathBuf),
    Http { url: String, client: reqwest::Client },
}

/// Reads postings exported by an external scraper as a JSON array,
/// either from a file on disk or from an HTTP endpoint.
pub struct JsonFeedFetcher {
    mode: Mode,
}

impl JsonFeedFetcher {
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            mode: Mode::File(path.into()),
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            mode: Mode::Http {
                url: url.into(),
                client: reqwest::Client::new(),
            },
        }
    }

    fn parse_items_from_str(s: &str) -> Result<Vec<RawPosting>> {
        let t0 = std::time::Instant::now();
        let items: Vec<RawPosting> =
            serde_json::from_str(s).context("parsing posting feed json")?;
        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("watch_feed_parse_ms").record(ms);
        Ok(items)
    }

    async fn fetch_inner(&self) -> Result<Vec<RawPosting>> {
        match &self.mode {
            Mode::File(path) => {
                let body = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("reading posting feed {}", path.display()))?;
                Self::parse_items_from_str(&body)
            }
            Mode::Http { url, client } => {
                let body = client
                    .get(url)
                    .send()
                    .await
                    .context("feed http get()")?
                    .error_for_status()
                    .context("feed non-2xx")?
                    .text()
                    .await
                    .context("feed http .text()")?;
                Self::parse_items_from_str(&body)
            }
        }
    }
}

#[async_trait]
impl PostingFetcher for JsonFeedFetcher {
    async fn fetch(&self) -> Result<Vec<RawPosting>, FetchError> {
        match self.fetch_inner().await {
            Ok(v) => Ok(v),
            Err(e) => {
                counter!("watch_fetch_errors_total").increment(1);
                Err(e.into())
            }
        }
    }

    fn name(&self) -> &'static str {
        "json-feed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_partial_records_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("postings.json");
        std::fs::write(
            &p,
            r#"[{"title":"Data Engineer","company":"Acme Corp","location":"NY","url":"https://x/1"},{"title":"Only title"}]"#,
        )
        .unwrap();
        let items = JsonFeedFetcher::from_file(&p).fetch().await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].company.as_deref(), Some("Acme Corp"));
        assert_eq!(items[1].url, None);
    }

    #[tokio::test]
    async fn missing_file_is_a_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = JsonFeedFetcher::from_file(dir.path().join("nope.json"))
            .fetch()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("reading posting feed"));
    }
}
