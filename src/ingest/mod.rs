// src/ingest/mod.rs
pub mod providers;
pub mod types;

use chrono::NaiveDateTime;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

use crate::ingest::types::{PostingFetcher, RawPosting};
use crate::novelty::{select_new, IdentityMatch};
use crate::posting::PostingRecord;

pub const UNKNOWN_COMPANY: &str = "Unknown Company";
pub const UNKNOWN_LOCATION: &str = "Unknown Location";
pub const UNKNOWN_DATE: &str = "Recent";

/// One-time metrics registration (so series show up once a recorder is installed).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("watch_fetched_total", "Raw postings returned by the fetcher.");
        describe_counter!("watch_new_total", "Postings classified as new.");
        describe_counter!("watch_matched_total", "Pending postings matched to a sponsor.");
        describe_counter!("watch_notified_total", "Postings flipped to notified.");
        describe_counter!("watch_fetch_errors_total", "Fetcher failures.");
        describe_counter!("watch_transport_errors_total", "Notification transport failures.");
        describe_counter!("watch_matcher_errors_total", "Postings skipped by the matcher.");
        describe_histogram!("watch_feed_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("watch_last_run_ts", "Unix ts when the watcher last ran.");
    });
}

/// Title keyword filter.
///
/// Exclusions are case-insensitive substrings of the title. The inclusion list
/// is only consulted when `require_keyword` is set; by default it lets every
/// title through.
#[derive(Debug, Clone, Default)]
pub struct KeywordFilter {
    pub keywords: Vec<String>,
    pub require_keyword: bool,
    pub excluded: Vec<String>,
}

impl KeywordFilter {
    pub fn is_relevant(&self, title: &str) -> bool {
        let title_lower = title.to_lowercase();
        let has_keyword = !self.require_keyword
            || self
                .keywords
                .iter()
                .any(|k| title_lower.contains(&k.to_lowercase()));
        let has_excluded = self
            .excluded
            .iter()
            .any(|k| title_lower.contains(&k.to_lowercase()));
        has_keyword && !has_excluded
    }
}

/// Trim surrounding whitespace; blank becomes `None`. Inner spacing is kept as scraped.
pub fn normalize_field(s: Option<String>) -> Option<String> {
    let s = s?;
    let out = s.trim();
    if out.is_empty() {
        None
    } else {
        Some(out.to_string())
    }
}

/// Normalize one raw posting. Postings without a title or URL are dropped.
pub fn normalize_posting(raw: RawPosting) -> Option<RawPosting> {
    let title = normalize_field(raw.title)?;
    let url = normalize_field(raw.url)?;
    Some(RawPosting {
        title: Some(title),
        company: normalize_field(raw.company).or_else(|| Some(UNKNOWN_COMPANY.to_string())),
        location: normalize_field(raw.location).or_else(|| Some(UNKNOWN_LOCATION.to_string())),
        date_posted: normalize_field(raw.date_posted).or_else(|| Some(UNKNOWN_DATE.to_string())),
        url: Some(url),
    })
}

/// Outcome of normalizing, filtering and deduplicating one fetched batch.
#[derive(Debug, Clone, Default)]
pub struct IngestBatch {
    /// Postings classified as new, in fetch order, all pending.
    pub new: Vec<PostingRecord>,
    /// Postings dropped for missing title/URL.
    pub dropped: usize,
    /// Postings dropped by the keyword filter.
    pub filtered: usize,
    /// Postings already known (store or earlier in the batch).
    pub duplicates: usize,
}

pub fn normalize_filter_dedup(
    now: NaiveDateTime,
    raw: Vec<RawPosting>,
    retained: &[PostingRecord],
    filter: &KeywordFilter,
    source: &str,
    identity: IdentityMatch,
) -> IngestBatch {
    let mut dropped = 0usize;
    let mut filtered = 0usize;
    let mut candidates = Vec::with_capacity(raw.len());
    for r in raw {
        let Some(posting) = normalize_posting(r) else {
            dropped += 1;
            continue;
        };
        if !filter.is_relevant(posting.title.as_deref().unwrap_or_default()) {
            filtered += 1;
            continue;
        }
        candidates.push(PostingRecord::pending(posting, source, now));
    }

    let before = candidates.len();
    let new = select_new(candidates, retained, identity);
    let duplicates = before - new.len();

    IngestBatch {
        new,
        dropped,
        filtered,
        duplicates,
    }
}

/// Fetch once. A failing fetcher yields an empty batch.
pub async fn fetch_postings(fetcher: &dyn PostingFetcher) -> Vec<RawPosting> {
    ensure_metrics_described();
    match fetcher.fetch().await {
        Ok(v) => {
            counter!("watch_fetched_total").increment(v.len() as u64);
            v
        }
        Err(e) => {
            tracing::warn!(target: "ingest", error = %e, fetcher = fetcher.name(), "fetch failed, continuing with no postings");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn raw(title: &str, company: Option<&str>, url: Option<&str>) -> RawPosting {
        RawPosting {
            title: Some(title.into()),
            company: company.map(Into::into),
            location: Some("NY".into()),
            date_posted: None,
            url: url.map(Into::into),
        }
    }

    fn default_filter() -> KeywordFilter {
        KeywordFilter {
            keywords: vec!["python".into()],
            require_keyword: false,
            excluded: vec!["5+ years".into(), "Manager".into()],
        }
    }

    #[test]
    fn exclusions_are_case_insensitive_and_inclusion_is_a_no_op() {
        let f = default_filter();
        assert!(f.is_relevant("Data Engineer"));
        assert!(!f.is_relevant("Engineering manager"));
        assert!(!f.is_relevant("Backend Dev (5+ YEARS)"));
    }

    #[test]
    fn inclusion_list_applies_when_required() {
        let f = KeywordFilter {
            require_keyword: true,
            ..default_filter()
        };
        assert!(f.is_relevant("Senior Python Developer"));
        assert!(!f.is_relevant("Data Engineer"));
    }

    #[test]
    fn normalize_fills_defaults_and_drops_urlless() {
        let p = normalize_posting(raw("  Data Engineer \n", None, Some(" https://x/1 "))).unwrap();
        assert_eq!(p.title.as_deref(), Some("Data Engineer"));
        assert_eq!(p.company.as_deref(), Some(UNKNOWN_COMPANY));
        assert_eq!(p.date_posted.as_deref(), Some(UNKNOWN_DATE));
        assert_eq!(p.url.as_deref(), Some("https://x/1"));
        assert!(normalize_posting(raw("Data Engineer", Some("Acme"), None)).is_none());
        assert!(normalize_posting(raw("   ", Some("Acme"), Some("u"))).is_none());
    }

    #[test]
    fn batch_counts_every_bucket() {
        let batch = vec![
            raw("Data Engineer", Some("Acme"), Some("u1")),
            raw("Data Engineer", Some("Acme"), Some("u2")),
            raw("Product Manager", Some("Acme"), Some("u3")),
            raw("Analyst", Some("Acme"), None),
        ];
        let out = normalize_filter_dedup(
            now(),
            batch,
            &[],
            &default_filter(),
            "LinkedIn",
            IdentityMatch::Exact,
        );
        assert_eq!(out.new.len(), 1);
        assert_eq!(out.duplicates, 1);
        assert_eq!(out.filtered, 1);
        assert_eq!(out.dropped, 1);
        assert_eq!(out.new[0].scraped_at, now());
        assert_eq!(out.new[0].source, "LinkedIn");
    }

    #[test]
    fn inner_spacing_survives_and_stays_distinct_in_exact_mode() {
        let p = normalize_posting(raw(" Data  Engineer ", Some("Acme"), Some("u1"))).unwrap();
        assert_eq!(p.title.as_deref(), Some("Data  Engineer"));

        let stored = normalize_filter_dedup(
            now(),
            vec![raw("Data  Engineer", Some("Acme"), Some("u1"))],
            &[],
            &default_filter(),
            "LinkedIn",
            IdentityMatch::Exact,
        )
        .new;
        let refetched = vec![
            raw(" Data  Engineer ", Some("Acme"), Some("u1")),
            raw("Data Engineer", Some("Acme"), Some("u1")),
        ];

        let exact = normalize_filter_dedup(
            now(),
            refetched.clone(),
            &stored,
            &default_filter(),
            "LinkedIn",
            IdentityMatch::Exact,
        );
        assert_eq!(exact.new.len(), 1);
        assert_eq!(exact.new[0].title, "Data Engineer");

        let folded = normalize_filter_dedup(
            now(),
            refetched,
            &stored,
            &default_filter(),
            "LinkedIn",
            IdentityMatch::Normalized,
        );
        assert!(folded.new.is_empty());
    }
}
