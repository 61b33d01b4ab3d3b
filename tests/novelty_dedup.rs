// tests/novelty_dedup.rs
use chrono::NaiveDate;
use sponsor_watch::ingest::types::RawPosting;
use sponsor_watch::novelty::{is_new, select_new, IdentityMatch};
use sponsor_watch::PostingRecord;

fn rec(title: &str, company: &str, location: &str, url: &str) -> PostingRecord {
    let at = NaiveDate::from_ymd_opt(2025, 6, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    PostingRecord::pending(
        RawPosting {
            title: Some(title.into()),
            company: Some(company.into()),
            location: Some(location.into()),
            date_posted: Some("Recent".into()),
            url: Some(url.into()),
        },
        "LinkedIn",
        at,
    )
}

#[test]
fn url_does_not_take_part_in_identity() {
    let stored = vec![rec("Data Engineer", "Acme Corp", "NY", "https://a")];
    let moved = rec("Data Engineer", "Acme Corp", "NY", "https://b");
    assert!(!is_new(&moved, &stored, IdentityMatch::Exact));

    let other_city = rec("Data Engineer", "Acme Corp", "Boston", "https://a");
    assert!(is_new(&other_city, &stored, IdentityMatch::Exact));
}

#[test]
fn selection_is_idempotent_against_its_own_output() {
    let candidates = vec![
        rec("Data Engineer", "Acme Corp", "NY", "https://1"),
        rec("ETL Developer", "Globex", "Remote", "https://2"),
        rec("Data Engineer", "Acme Corp", "NY", "https://3"),
    ];
    let first = select_new(candidates.clone(), &[], IdentityMatch::Exact);
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].url, "https://1");
    assert_eq!(first[1].title, "ETL Developer");

    let again = select_new(candidates, &first, IdentityMatch::Exact);
    assert!(again.is_empty());
}

#[test]
fn exact_mode_is_case_sensitive_normalized_is_not() {
    let stored = vec![rec("Data Engineer", "Acme Corp", "NY", "https://a")];
    let shouty = rec("DATA ENGINEER", " Acme   Corp ", "ny", "https://a");
    assert!(is_new(&shouty, &stored, IdentityMatch::Exact));
    assert!(!is_new(&shouty, &stored, IdentityMatch::Normalized));
}
