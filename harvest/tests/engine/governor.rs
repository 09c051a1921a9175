use std::sync::Arc;
use std::time::Duration;

use harvest::GovernorConfig;
use harvest_mock::MemoryStore;
use tokio::time::Instant;

use crate::helpers::*;

fn tight(max_weight: u32) -> GovernorConfig {
    GovernorConfig {
        max_weight,
        ..GovernorConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn exhausted_budget_waits_for_the_server_window() {
    // Budget spent at 10:05:30: the next request waits until 10:06:00.
    let (source, exchange) = SimulatedExchange::new_with_controller("sim", at(10, 5, 30));
    let store = Arc::new(MemoryStore::new());
    let eth = sym(ETH);
    exchange
        .push_trades(&eth, fixtures::contiguous_trades(1, at(10, 0, 0), 2))
        .await;
    exchange.set_weight_per_request(10).await;

    let h = builder(source, store)
        .governor_config(tight(10))
        .build()
        .unwrap();
    let started = Instant::now();
    let report = h.ingest_trades(&eth, 1).await.unwrap();
    let waited = started.elapsed();

    assert_eq!(report.pages_fetched, 2);
    assert!(waited >= Duration::from_secs(30), "waited {waited:?}");
    assert!(waited < Duration::from_secs(31), "waited {waited:?}");
}

#[tokio::test(start_paused = true)]
async fn partly_used_budget_paces_requests() {
    let (source, exchange) = SimulatedExchange::new_with_controller("sim", at(10, 5, 0));
    let store = Arc::new(MemoryStore::new());
    let eth = sym(ETH);
    for first in [1, 3] {
        exchange
            .push_trades(&eth, fixtures::contiguous_trades(first, at(10, 0, 0), 2))
            .await;
    }

    let h = builder(source, store)
        .page_limits(1500, 2)
        .build()
        .unwrap();
    let started = Instant::now();
    let report = h.ingest_trades(&eth, 1).await.unwrap();

    // Three requests: the first is free, the other two are paced.
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(started.elapsed(), Duration::from_millis(1_000));
}

#[tokio::test(start_paused = true)]
async fn one_ban_halts_every_symbol_sharing_the_governor() {
    let (source, script) = ScriptedSource::new_with_controller("scripted");
    let store = Arc::new(MemoryStore::new());
    let (btc, eth) = (sym(BTC), sym(ETH));
    script
        .push_trades(
            &btc,
            MockBehavior::Fail(harvest::HarvestError::RateLimited {
                status: 429,
                retry_after_ms: None,
            }),
        )
        .await;

    let h = builder(source, store)
        .max_concurrent_symbols(1)
        .build()
        .unwrap();
    let report = h
        .harvest()
        .symbols(&[btc.clone(), eth.clone()])
        .unwrap()
        .start(harvest::Cursor::id(1))
        .run()
        .await
        .unwrap();

    assert_eq!(report.failures.len(), 2);
    assert!(matches!(
        report.failures[1].error,
        harvest::HarvestError::Banned { .. }
    ));
    assert!(script.requests_for(harvest::Dataset::Trades).await.iter().all(|r| r.symbol == btc));
    assert!(h.governor().tripped_for().is_some());
}
