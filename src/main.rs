//! sponsor-watch: one batch run.
//! Loads config, runs the watcher once, prints the summary and the new postings.
//!
//! Scheduling is left to cron or a systemd timer.

use chrono::Local;
use sponsor_watch::notify::transport_from_env;
use sponsor_watch::{WatchConfig, Watcher};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sponsor_watch=info,warn"));

    let json = std::env::var("SPONSOR_WATCH_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = WatchConfig::load_default()?;
    let transport = transport_from_env();
    let watcher = Watcher::from_config(&cfg, transport)?;

    let report = watcher.run_once(Local::now().naive_local()).await?;

    println!("{}", report.summary);
    if report.new_postings.is_empty() {
        println!("No new postings this run.");
    } else {
        println!("\n===== NEW POSTINGS =====");
        for (i, p) in report.new_postings.iter().enumerate() {
            println!("{}. {} at {}", i + 1, p.title, p.company);
            println!("   Location: {}", p.location);
            println!("   Posted: {}", p.date_posted);
            println!("   URL: {}", p.url);
        }
    }
    for m in &report.matches {
        println!(
            "match: {} -> {} ({:.2})",
            m.posting.company, m.matched_reference_name, m.score
        );
    }
    Ok(())
}
