//! Demo: two in-memory runs through the watcher, digest written to the log.

use std::sync::Arc;

use chrono::{Duration, Local};
use sponsor_watch::ingest::providers::fixed::StaticFetcher;
use sponsor_watch::ingest::types::RawPosting;
use sponsor_watch::notify::LogTransport;
use sponsor_watch::roster::StaticRoster;
use sponsor_watch::store::MemoryStore;
use sponsor_watch::{WatchConfig, Watcher};

fn posting(title: &str, company: &str, location: &str, n: u32) -> RawPosting {
    RawPosting {
        title: Some(title.into()),
        company: Some(company.into()),
        location: Some(location.into()),
        date_posted: Some("1h ago".into()),
        url: Some(format!("https://jobs.example/view/{n}")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let fetcher = Arc::new(StaticFetcher::new(vec![
        posting("Data Engineer", "Acme Corp", "New York, NY", 1),
        posting("Data Engineer", "Acme Corp", "New York, NY", 2),
        posting("Analytics Manager", "Globex", "Remote", 3),
        posting("Platform Engineer", "Initech Inc", "Austin, TX", 4),
        posting("ETL Developer", "Tiny Startup", "Remote", 5),
    ]));
    let roster = Arc::new(StaticRoster::from_names(&[
        "ACME CORPORATION",
        "INITECH INCORPORATED",
        "GLOBEX LLC",
    ]));
    let store = Arc::new(MemoryStore::default());

    let watcher = Watcher::new(
        &WatchConfig::default(),
        fetcher,
        roster,
        store.clone(),
        Arc::new(LogTransport),
    )?;

    let t0 = Local::now().naive_local();
    for (i, now) in [t0, t0 + Duration::minutes(20)].into_iter().enumerate() {
        let report = watcher.run_once(now).await?;
        println!("run {}: {}", i + 1, report.summary);
    }
    println!("stored records: {}", store.snapshot().len());
    Ok(())
}
