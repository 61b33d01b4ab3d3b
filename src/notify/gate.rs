// src/notify/gate.rs
use metrics::counter;
use std::collections::HashSet;
use std::sync::Arc;

use super::NotificationTransport;
use crate::matcher::SimilarityMatcher;
use crate::novelty::{IdentityKey, IdentityMatch};
use crate::posting::{MatchResult, PostingRecord, ReferenceEntry};

/// Owner of the `pending -> notified` transition.
///
/// - Only pending records are matched.
/// - A batch goes out in one transport call.
/// - Flags flip only after the transport reports success; a failed batch
///   leaves every record pending so the next run sends it again.
pub struct NotificationGate {
    transport: Arc<dyn NotificationTransport>,
}

impl NotificationGate {
    pub fn new(transport: Arc<dyn NotificationTransport>) -> Self {
        Self { transport }
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    /// Best sponsor match for every pending record. Records the matcher
    /// rejects are skipped; the second value counts them.
    pub fn pending_matches(
        &self,
        records: &[PostingRecord],
        matcher: &SimilarityMatcher,
        roster: &[ReferenceEntry],
    ) -> (Vec<MatchResult>, usize) {
        let mut out = Vec::new();
        let mut skipped = 0usize;
        for rec in records.iter().filter(|r| !r.is_notified()) {
            match matcher.best_match(rec, roster) {
                Ok(Some(m)) => out.push(m),
                Ok(None) => {}
                Err(e) => {
                    skipped += 1;
                    counter!("watch_matcher_errors_total").increment(1);
                    tracing::warn!(target: "matcher", error = %e, title = %rec.title, "posting skipped");
                }
            }
        }
        (out, skipped)
    }

    /// One transport call for the whole batch. Returns whether it was delivered.
    pub async fn notify_batch(&self, matches: &[MatchResult]) -> bool {
        if matches.is_empty() {
            return false;
        }
        match self.transport.send(matches).await {
            Ok(()) => {
                tracing::info!(target: "notify", transport = self.transport.name(), count = matches.len(), "digest delivered");
                true
            }
            Err(e) => {
                counter!("watch_transport_errors_total").increment(1);
                tracing::warn!(target: "notify", transport = self.transport.name(), error = %e, "digest not delivered, flags left pending");
                false
            }
        }
    }

    /// Send `matches` and, on success, mark the referenced records notified.
    /// Returns how many records flipped.
    pub async fn deliver(&self, records: &mut [PostingRecord], matches: &[MatchResult]) -> usize {
        if !self.notify_batch(matches).await {
            return 0;
        }
        let flipped = mark_delivered(records, matches);
        counter!("watch_notified_total").increment(flipped as u64);
        flipped
    }
}

/// Flip every pending record whose identity appears in `matches`.
fn mark_delivered(records: &mut [PostingRecord], matches: &[MatchResult]) -> usize {
    let sent: HashSet<IdentityKey> = matches
        .iter()
        .map(|m| IdentityKey::of(&m.posting, IdentityMatch::Exact))
        .collect();
    let mut flipped = 0usize;
    for rec in records.iter_mut() {
        if !rec.is_notified() && sent.contains(&IdentityKey::of(rec, IdentityMatch::Exact)) {
            rec.mark_notified();
            flipped += 1;
        }
    }
    flipped
}
