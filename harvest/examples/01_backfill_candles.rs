mod common;

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use harvest::{Harvester, Symbol};
use harvest_mock::MemoryStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    common::init_tracing();
    let btc = Symbol::new("BTCUSDT")?;
    let source = common::get_source(std::slice::from_ref(&btc)).await?;
    let store = Arc::new(MemoryStore::new());

    let harvester = Harvester::builder()
        .with_source(source)
        .with_store(store.clone())
        .max_pages_per_run(5)
        .build()?;

    let start = Utc::now() - TimeDelta::hours(1);
    // Two passes: the second one resumes from the first one's checkpoint.
    for pass in 1..=2 {
        let report = harvester.ingest_candles(&btc, start).await?;
        println!(
            "pass {pass}: {} candles stored, {} withheld, next {} ({:?})",
            report.records_persisted, report.records_withheld, report.next_cursor, report.drained
        );
    }

    let stored = store.stored_candles(&btc).await;
    if let (Some(first), Some(last)) = (stored.first(), stored.last()) {
        println!(
            "{btc}: {} candles from {} to {}",
            stored.len(),
            first.period_start,
            last.period_start
        );
    }
    Ok(())
}
