// tests/notify_exactly_once.rs
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::sync::Arc;

use sponsor_watch::ingest::providers::fixed::StaticFetcher;
use sponsor_watch::ingest::types::RawPosting;
use sponsor_watch::notify::RecordingTransport;
use sponsor_watch::roster::StaticRoster;
use sponsor_watch::store::MemoryStore;
use sponsor_watch::{NotifyState, WatchConfig, Watcher};

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 3)
        .unwrap()
        .and_hms_opt(14, 0, 0)
        .unwrap()
}

fn acme() -> RawPosting {
    RawPosting {
        title: Some("Data Engineer".into()),
        company: Some("Acme Corp".into()),
        location: Some("NY".into()),
        date_posted: Some("2 days ago".into()),
        url: Some("https://jobs.example/acme".into()),
    }
}

fn watcher(items: Vec<RawPosting>, store: Arc<MemoryStore>, transport: Arc<RecordingTransport>) -> Watcher {
    Watcher::new(
        &WatchConfig::default(),
        Arc::new(StaticFetcher::new(items)),
        Arc::new(StaticRoster::from_names(&["ACME CORPORATION"])),
        store,
        transport,
    )
    .unwrap()
}

#[tokio::test]
async fn failed_send_is_retried_on_next_run_then_never_again() {
    let store = Arc::new(MemoryStore::default());
    let transport = Arc::new(RecordingTransport::failing(1));

    let first = watcher(vec![acme()], store.clone(), transport.clone())
        .run_once(t0())
        .await
        .unwrap();
    assert_eq!(first.summary.matched, 1);
    assert_eq!(first.summary.notified, 0);
    assert!(!first.summary.delivered);
    let saved = store.snapshot();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].state(), NotifyState::Pending);

    // the feed no longer lists the posting; the pending record alone drives the retry
    let second = watcher(Vec::new(), store.clone(), transport.clone())
        .run_once(t0() + Duration::minutes(10))
        .await
        .unwrap();
    assert_eq!(second.summary.new, 0);
    assert_eq!(second.summary.notified, 1);
    assert_eq!(store.snapshot()[0].state(), NotifyState::Notified);

    let calls = transport.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], calls[1]);

    let third = watcher(vec![acme()], store.clone(), transport.clone())
        .run_once(t0() + Duration::minutes(20))
        .await
        .unwrap();
    assert_eq!(third.summary.matched, 0);
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn one_call_per_run_regardless_of_match_count() {
    let store = Arc::new(MemoryStore::default());
    let transport = Arc::new(RecordingTransport::new());
    let mut second = acme();
    second.title = Some("Python Developer".into());
    second.url = Some("https://jobs.example/acme-2".into());

    let report = watcher(vec![acme(), second], store.clone(), transport.clone())
        .run_once(t0())
        .await
        .unwrap();
    assert_eq!(report.summary.matched, 2);
    assert_eq!(report.summary.notified, 2);
    assert_eq!(transport.call_count(), 1);
    assert_eq!(transport.calls.lock().unwrap()[0].len(), 2);
    assert!(store.snapshot().iter().all(|r| r.is_notified()));
}
