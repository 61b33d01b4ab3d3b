// src/notify/mod.rs
pub mod email;
pub mod gate;
pub mod slack;

use chrono::NaiveDateTime;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::TransportError;
use crate::posting::{MatchResult, SCRAPED_DATE_FORMAT};

pub use gate::NotificationGate;

/// Delivers one batch of matches in a single outbound call.
#[async_trait::async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn send(&self, matches: &[MatchResult]) -> Result<(), TransportError>;
    fn name(&self) -> &'static str;
}

pub fn digest_subject(matches: &[MatchResult]) -> String {
    format!(
        "Job Match Alert: {} H-1B Sponsoring Companies",
        matches.len()
    )
}

/// HTML digest: one table row per match.
pub fn render_html_digest(matches: &[MatchResult], found_at: NaiveDateTime) -> String {
    use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

    let mut html = format!(
        "<html>\n  <body>\n    <h2>Job Opportunities at H-1B Sponsoring Companies</h2>\n    \
         <p>We found {} jobs at companies known to sponsor H-1B visas:</p>\n    \
         <table border=\"1\" cellpadding=\"5\">\n      \
         <tr><th>Company</th><th>Matched Company</th><th>Job Title</th><th>Match Score</th><th>Link</th></tr>\n",
        matches.len()
    );
    for m in matches {
        html.push_str(&format!(
            "      <tr><td>{}</td><td>{}</td><td>{}</td><td>{:.2}</td><td><a href=\"{}\">View Job</a></td></tr>\n",
            text(&m.posting.company),
            text(&m.matched_reference_name),
            text(&m.posting.title),
            m.score,
            attr(&m.posting.url),
        ));
    }
    html.push_str(&format!(
        "    </table>\n    <p>Date found: {}</p>\n  </body>\n</html>\n",
        found_at.format(SCRAPED_DATE_FORMAT)
    ));
    html
}

/// Plain-text digest, one line per match.
pub fn render_text_digest(matches: &[MatchResult]) -> String {
    let mut out = digest_subject(matches);
    for (i, m) in matches.iter().enumerate() {
        out.push_str(&format!(
            "\n{}. {} at {} (matched {}, score {:.2}) {} [{}]",
            i + 1,
            m.posting.title,
            m.posting.company,
            m.matched_reference_name,
            m.score,
            m.posting.url,
            m.posting.location,
        ));
    }
    out
}

/// Writes the digest to the log and reports success. Used for dry runs.
#[derive(Debug, Clone, Default)]
pub struct LogTransport;

#[async_trait::async_trait]
impl NotificationTransport for LogTransport {
    async fn send(&self, matches: &[MatchResult]) -> Result<(), TransportError> {
        tracing::info!(target: "notify", count = matches.len(), "dry run digest:\n{}", render_text_digest(matches));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Stand-in when no real transport can be built. Logs the digest and reports
/// failure, so matched records stay pending until a transport is configured.
#[derive(Debug, Clone)]
pub struct UnconfiguredTransport {
    pub reason: String,
}

#[async_trait::async_trait]
impl NotificationTransport for UnconfiguredTransport {
    async fn send(&self, matches: &[MatchResult]) -> Result<(), TransportError> {
        tracing::warn!(target: "notify", count = matches.len(), reason = %self.reason, "no transport configured, digest not sent:\n{}", render_text_digest(matches));
        Err(TransportError(format!("no transport configured: {}", self.reason)))
    }

    fn name(&self) -> &'static str {
        "unconfigured"
    }
}

/// Transport from the environment: `NOTIFY_DRY_RUN=1` logs, `SLACK_WEBHOOK_URL`
/// posts to Slack, otherwise SMTP. Missing SMTP settings do not stop the run.
pub fn transport_from_env() -> Arc<dyn NotificationTransport> {
    let dry_run = std::env::var("NOTIFY_DRY_RUN")
        .ok()
        .is_some_and(|v| v == "1");
    if dry_run {
        return Arc::new(LogTransport);
    }
    if let Some(slack) = slack::SlackTransport::from_env() {
        return Arc::new(slack);
    }
    match email::EmailTransport::from_env() {
        Ok(email) => Arc::new(email),
        Err(e) => {
            let reason = format!("{e:#}");
            tracing::warn!(target: "notify", %reason, "email transport unavailable, matches stay pending");
            Arc::new(UnconfiguredTransport { reason })
        }
    }
}

// --- Test helper ---
/// Records every batch; fails the first `fail_first` calls.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub calls: Mutex<Vec<Vec<MatchResult>>>,
    fail_first: AtomicUsize,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(times: usize) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_first: AtomicUsize::new(times),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl NotificationTransport for RecordingTransport {
    async fn send(&self, matches: &[MatchResult]) -> Result<(), TransportError> {
        if let Ok(mut c) = self.calls.lock() {
            c.push(matches.to_vec());
        }
        let remaining = self.fail_first.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_first.store(remaining - 1, Ordering::SeqCst);
            return Err(TransportError("simulated outage".into()));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
