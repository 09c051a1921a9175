use std::sync::Arc;

use harvest::{Checkpoint, Cursor, ErrorKind, HarvestError};
use harvest_mock::MemoryStore;

use crate::helpers::*;

#[tokio::test(start_paused = true)]
async fn one_failing_symbol_does_not_stop_the_others() {
    let (source, script) = ScriptedSource::new_with_controller("scripted");
    let store = Arc::new(MemoryStore::new());
    let (btc, eth, sol) = (sym(BTC), sym(ETH), sym(SOL));
    for s in [&btc, &sol] {
        script
            .push_trades(
                s,
                MockBehavior::Return(fetched(fixtures::contiguous_trades(1, at(8, 0, 0), 3), at(8, 1, 0), 2)),
            )
            .await;
    }
    script
        .push_trades(&eth, MockBehavior::Fail(HarvestError::malformed("truncated body")))
        .await;

    let report = harvester(source, store.clone())
        .harvest()
        .symbols(&[btc.clone(), eth.clone(), sol.clone()])
        .unwrap()
        .start(Cursor::id(1))
        .run()
        .await
        .unwrap();

    assert!(!report.is_complete());
    assert_eq!(
        report.reports.iter().map(|r| r.symbol.clone()).collect::<Vec<_>>(),
        vec![btc.clone(), sol.clone()]
    );
    assert_eq!(report.records_persisted(), 6);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].symbol, eth);
    assert_eq!(report.failures[0].error.kind(), ErrorKind::Protocol);
    assert!(store.stored_trades(&eth).await.is_empty());

    let err = report.into_error().unwrap();
    assert_eq!(err.flatten(), vec![HarvestError::malformed("truncated body")]);
}

#[tokio::test(start_paused = true)]
async fn tracked_symbols_are_harvested_from_their_checkpoints() {
    let (source, script) = ScriptedSource::new_with_controller("scripted");
    let store = Arc::new(MemoryStore::new());
    let (btc, eth) = (sym(BTC), sym(ETH));
    store
        .seed_checkpoint(&btc, Checkpoint::Trade { trade_id: 10 })
        .await;
    store
        .seed_checkpoint(&eth, Checkpoint::Trade { trade_id: 20 })
        .await;
    script
        .push_trades(
            &eth,
            MockBehavior::Return(fetched(fixtures::contiguous_trades(21, at(8, 0, 0), 2), at(8, 1, 0), 2)),
        )
        .await;

    let report = harvester(source, store.clone())
        .harvest_tracked(Cursor::id(1))
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.reports.len(), 2);
    let cursors: Vec<_> = script.requests().await.iter().map(|r| r.cursor).collect();
    assert!(cursors.contains(&Cursor::id(11)));
    assert!(cursors.contains(&Cursor::id(21)));
    assert_eq!(store.stored_trades(&eth).await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn nothing_tracked_is_an_empty_report() {
    let (source, script) = ScriptedSource::new_with_controller("scripted");
    let report = harvester(source, Arc::new(MemoryStore::new()))
        .harvest_tracked(Cursor::time(at(0, 0, 0)))
        .await
        .unwrap();
    assert!(report.reports.is_empty());
    assert!(script.requests().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn stored_records_can_be_read_back() {
    let (source, script) = ScriptedSource::new_with_controller("scripted");
    let store = Arc::new(MemoryStore::new());
    let btc = sym(BTC);
    script
        .push_candles(
            &btc,
            MockBehavior::Return(fetched(fixtures::minute_candles(at(9, 0, 0), 5), at(10, 0, 0), 2)),
        )
        .await;
    script
        .push_trades(
            &btc,
            MockBehavior::Return(fetched(fixtures::contiguous_trades(1, at(9, 0, 0), 4), at(10, 0, 0), 2)),
        )
        .await;
    let h = harvester(source, store);
    h.ingest_candles(&btc, at(9, 0, 0)).await.unwrap();
    h.ingest_trades(&btc, 1).await.unwrap();

    let candles = h.candles_since(&btc, at(9, 3, 0)).await.unwrap();
    assert_eq!(candles, fixtures::minute_candles(at(9, 3, 0), 2));
    let trades = h.trades_from(&btc, 3).await.unwrap();
    assert_eq!(
        trades.iter().map(|t| t.trade_id).collect::<Vec<_>>(),
        vec![3, 4]
    );
}

#[tokio::test]
async fn duplicate_symbols_are_rejected_up_front() {
    let (source, _script) = ScriptedSource::new_with_controller("scripted");
    let h = harvester(source, Arc::new(MemoryStore::new()));

    let err = h
        .harvest()
        .symbols(&[sym(BTC), sym("btcusdt")])
        .err()
        .unwrap();
    assert!(matches!(err, HarvestError::InvalidArg(_)));

    let err = h
        .harvest()
        .add_symbol(sym(ETH))
        .unwrap()
        .add_symbol(sym(ETH))
        .err()
        .unwrap();
    assert!(matches!(err, HarvestError::InvalidArg(_)));
}

#[tokio::test]
async fn harvest_needs_symbols_and_a_start() {
    let (source, _script) = ScriptedSource::new_with_controller("scripted");
    let h = harvester(source, Arc::new(MemoryStore::new()));

    let err = h.harvest().start(Cursor::id(1)).run().await.unwrap_err();
    assert!(matches!(err, HarvestError::InvalidArg(_)));

    let err = h
        .harvest()
        .add_symbol(sym(BTC))
        .unwrap()
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, HarvestError::InvalidArg(_)));
}
