// src/novelty.rs
//! Novelty filter: decides which fetched postings are not yet in the store.
//!
//! Identity is the `(title, company, location)` tuple, never the URL.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::posting::PostingRecord;

/// How identity tuples are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityMatch {
    /// Byte-for-byte comparison.
    #[default]
    Exact,
    /// Case-folded, whitespace collapsed and trimmed.
    Normalized,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    title: String,
    company: String,
    location: String,
}

impl IdentityKey {
    pub fn of(rec: &PostingRecord, mode: IdentityMatch) -> Self {
        let f = |s: &str| match mode {
            IdentityMatch::Exact => s.to_string(),
            IdentityMatch::Normalized => fold(s),
        };
        Self {
            title: f(&rec.title),
            company: f(&rec.company),
            location: f(&rec.location),
        }
    }
}

fn fold(s: &str) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));
    re_ws.replace_all(s.trim(), " ").to_lowercase()
}

/// True iff no record in `previous` shares the candidate's identity.
pub fn is_new(candidate: &PostingRecord, previous: &[PostingRecord], mode: IdentityMatch) -> bool {
    let key = IdentityKey::of(candidate, mode);
    !previous.iter().any(|p| IdentityKey::of(p, mode) == key)
}

/// Keep the candidates that are new relative to `previous` and to every
/// earlier candidate of the same batch. Input order is preserved and each
/// kept record is pending.
pub fn select_new(
    candidates: Vec<PostingRecord>,
    previous: &[PostingRecord],
    mode: IdentityMatch,
) -> Vec<PostingRecord> {
    let mut seen: HashSet<IdentityKey> =
        previous.iter().map(|p| IdentityKey::of(p, mode)).collect();
    let mut out = Vec::new();
    for c in candidates {
        if c.is_notified() {
            tracing::warn!(target: "ingest", title = %c.title, "candidate arrived already notified, skipped");
            continue;
        }
        if seen.insert(IdentityKey::of(&c, mode)) {
            out.push(c);
        } else {
            tracing::debug!(target: "ingest", title = %c.title, company = %c.company, "duplicate posting");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::RawPosting;
    use chrono::NaiveDate;

    fn rec(title: &str, company: &str, location: &str, url: &str) -> PostingRecord {
        let at = NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        PostingRecord::pending(
            RawPosting {
                title: Some(title.into()),
                company: Some(company.into()),
                location: Some(location.into()),
                date_posted: Some("1h ago".into()),
                url: Some(url.into()),
            },
            "LinkedIn",
            at,
        )
    }

    #[test]
    fn url_is_not_part_of_identity() {
        let prev = vec![rec("Data Engineer", "Acme", "NY", "https://a/1")];
        let cand = rec("Data Engineer", "Acme", "NY", "https://a/2?tracking=x");
        assert!(!is_new(&cand, &prev, IdentityMatch::Exact));
    }

    #[test]
    fn exact_mode_is_case_and_whitespace_sensitive() {
        let prev = vec![rec("Data Engineer", "Acme", "NY", "u")];
        assert!(is_new(&rec("data engineer", "Acme", "NY", "u"), &prev, IdentityMatch::Exact));
        assert!(is_new(&rec("Data  Engineer", "Acme", "NY", "u"), &prev, IdentityMatch::Exact));
    }

    #[test]
    fn normalized_mode_folds_case_and_whitespace() {
        let prev = vec![rec("Data Engineer", "Acme", "NY", "u")];
        let cand = rec(" data   ENGINEER ", "acme", "ny", "u");
        assert!(!is_new(&cand, &prev, IdentityMatch::Normalized));
    }

    #[test]
    fn select_new_dedups_within_batch_and_is_idempotent() {
        let prev = vec![rec("Analyst", "Globex", "SF", "u0")];
        let batch = vec![
            rec("Data Engineer", "Acme", "NY", "u1"),
            rec("Data Engineer", "Acme", "NY", "u2"),
            rec("Analyst", "Globex", "SF", "u3"),
        ];
        let first = select_new(batch.clone(), &prev, IdentityMatch::Exact);
        let second = select_new(batch, &prev, IdentityMatch::Exact);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].url, "u1");
        assert_eq!(first, second);
        assert!(!first[0].is_notified());
    }

    #[test]
    fn merged_record_is_never_new_again() {
        let mut working = Vec::new();
        let a = rec("SRE", "Initech", "Austin", "u1");
        assert!(is_new(&a, &working, IdentityMatch::Exact));
        working.push(a.clone());
        assert!(!is_new(&a, &working, IdentityMatch::Exact));
    }
}
