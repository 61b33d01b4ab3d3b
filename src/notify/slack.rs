// src/notify/slack.rs
use anyhow::Context;
use reqwest::Client;
use std::time::Duration;

use super::{render_text_digest, NotificationTransport};
use crate::error::TransportError;
use crate::posting::MatchResult;

/// Posts the text digest to a Slack incoming webhook.
pub struct SlackTransport {
    webhook_url: String,
    client: Client,
    timeout: Duration,
}

impl SlackTransport {
    pub fn new(url: String) -> Self {
        Self {
            webhook_url: url,
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    /// `None` when `SLACK_WEBHOOK_URL` is unset or blank.
    pub fn from_env() -> Option<Self> {
        std::env::var("SLACK_WEBHOOK_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .map(Self::new)
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }
}

#[async_trait::async_trait]
impl NotificationTransport for SlackTransport {
    async fn send(&self, matches: &[MatchResult]) -> Result<(), TransportError> {
        let body = serde_json::json!({ "text": render_text_digest(matches) });
        self.client
            .post(&self.webhook_url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .context("slack post")?
            .error_for_status()
            .context("slack non-2xx")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "slack"
    }
}
