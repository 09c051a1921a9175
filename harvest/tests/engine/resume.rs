use std::sync::Arc;

use chrono::TimeDelta;
use harvest::{Checkpoint, CheckpointStore, Cursor, Dataset, DrainReason, ErrorKind, Harvester};
use harvest_mock::MemoryStore;

use crate::helpers::*;

#[tokio::test(start_paused = true)]
async fn failed_commit_resumes_without_duplicates_or_holes() {
    let (source, exchange) = SimulatedExchange::new_with_controller("sim", at(0, 10, 30));
    let store = Arc::new(MemoryStore::new());
    let btc = sym(BTC);
    exchange
        .upsert_candles(&btc, fixtures::minute_candles(at(0, 0, 0), 10))
        .await;
    store.fail_commits_after(2).await;

    let h = builder(source, store.clone())
        .page_limits(3, 1000)
        .build()
        .unwrap();
    let err = h.ingest_candles(&btc, at(0, 0, 0)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert_eq!(store.stored_candles(&btc).await.len(), 6);
    assert_eq!(
        store.last_checkpoint(&btc, Dataset::Candles).await.unwrap(),
        Some(Checkpoint::Candle {
            period_start: at(0, 5, 0)
        })
    );

    store.heal().await;
    let report = h.ingest_candles(&btc, at(0, 0, 0)).await.unwrap();
    assert_eq!(report.started_at, Cursor::time(at(0, 6, 0)));
    assert_eq!(report.records_persisted, 4);
    assert_eq!(
        store.stored_candles(&btc).await,
        fixtures::minute_candles(at(0, 0, 0), 10)
    );
}

#[tokio::test(start_paused = true)]
async fn repeated_runs_follow_the_exchange_clock() {
    let (source, exchange) = SimulatedExchange::new_with_controller("sim", at(0, 2, 10));
    let store = Arc::new(MemoryStore::new());
    let btc = sym(BTC);
    exchange
        .upsert_candles(&btc, fixtures::minute_candles(at(0, 0, 0), 3))
        .await;
    let h = harvester(source, store.clone());

    // 00:02 is still open.
    let first = h.ingest_candles(&btc, at(0, 0, 0)).await.unwrap();
    assert_eq!(first.records_persisted, 2);
    assert_eq!(first.next_cursor, Cursor::time(at(0, 2, 0)));

    // The open minute gets its final values and a new minute begins.
    exchange.advance_clock(TimeDelta::minutes(1)).await;
    exchange
        .upsert_candles(&btc, fixtures::minute_candles(at(0, 2, 0), 2))
        .await;
    let second = h.ingest_candles(&btc, at(0, 0, 0)).await.unwrap();
    assert_eq!(second.started_at, Cursor::time(at(0, 2, 0)));
    assert_eq!(second.records_persisted, 1);
    assert_eq!(second.records_withheld, 3);
    assert_eq!(second.drained, DrainReason::AwaitingClose);

    let stored = store.stored_candles(&btc).await;
    assert_eq!(stored, fixtures::minute_candles(at(0, 0, 0), 3));
    assert!(stored.windows(2).all(|w| w[0].period_start < w[1].period_start));
}

#[tokio::test(start_paused = true)]
async fn read_failure_surfaces_before_any_request() {
    let (source, exchange) = SimulatedExchange::new_with_controller("sim", at(1, 0, 0));
    let store = Arc::new(MemoryStore::new());
    store.fail_reads(true).await;

    let err = harvester(source, store)
        .ingest_trades(&sym(SOL), 1)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert!(exchange.requests().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn checkpoints_are_kept_per_dataset() {
    let (source, _exchange) = SimulatedExchange::new_with_controller("sim", at(1, 0, 0));
    let store = Arc::new(MemoryStore::new());
    let sol = sym(SOL);
    store
        .seed_checkpoint(&sol, Checkpoint::Trade { trade_id: 9 })
        .await;
    let h = harvester(source, store);

    let report = h.ingest_trades(&sol, 1).await.unwrap();
    assert_eq!(report.started_at, Cursor::id(10));

    // A candle run for the same symbol has its own, empty, checkpoint.
    let report = h.ingest_candles(&sol, at(0, 0, 0)).await.unwrap();
    assert_eq!(report.checkpoint, None);
}

#[tokio::test(start_paused = true)]
async fn transient_failure_is_retried_inside_the_run() {
    let (source, exchange) = SimulatedExchange::new_with_controller("sim", at(1, 0, 0));
    let store = Arc::new(MemoryStore::new());
    let sol = sym(SOL);
    exchange
        .push_trades(&sol, fixtures::contiguous_trades(1, at(0, 0, 0), 3))
        .await;
    exchange.fail_next(harvest::HarvestError::transport("reset")).await;

    let report = Harvester::builder()
        .with_source(source)
        .with_store(store.clone())
        .build()
        .unwrap()
        .ingest_trades(&sol, 1)
        .await
        .unwrap();

    assert_eq!(report.records_persisted, 3);
    // One failed attempt, the page, and the terminal empty page.
    assert_eq!(exchange.requests().await.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn abandoning_a_hung_call_leaves_the_checkpoint_in_place() {
    let (source, script) = ScriptedSource::new_with_controller("scripted");
    let store = Arc::new(MemoryStore::new());
    let btc = sym(BTC);
    script
        .push_trades(
            &btc,
            MockBehavior::Return(fetched(fixtures::contiguous_trades(1, at(8, 0, 0), 2), at(8, 1, 0), 2)),
        )
        .await;
    script.push_trades(&btc, MockBehavior::Hang).await;
    let h = harvester(source, store.clone());

    let outcome = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        h.ingest_trades(&btc, 1),
    )
    .await;
    assert!(outcome.is_err());
    assert_eq!(
        store.last_checkpoint(&btc, Dataset::Trades).await.unwrap(),
        Some(Checkpoint::Trade { trade_id: 2 })
    );

    // The next run picks up right after the last commit.
    let report = h.ingest_trades(&btc, 1).await.unwrap();
    assert_eq!(report.started_at, Cursor::id(3));
}
