use std::sync::Arc;

use chrono::TimeDelta;
use harvest::{Checkpoint, CheckpointStore, Cursor, Dataset, DrainReason};
use harvest_mock::MemoryStore;

use crate::helpers::*;

#[tokio::test(start_paused = true)]
async fn open_minute_is_withheld_and_closed_ones_are_stored() {
    let (source, script) = ScriptedSource::new_with_controller("scripted");
    let store = Arc::new(MemoryStore::new());
    let btc = sym(BTC);
    // Server clock sits inside 10:03, so the 10:03 candle is still open.
    script
        .push_candles(
            &btc,
            MockBehavior::Return(fetched(
                fixtures::minute_candles(at(10, 0, 0), 4),
                at(10, 3, 30),
                4,
            )),
        )
        .await;

    let h = harvester(source, store.clone());
    let report = h.ingest(&btc, Cursor::time(at(10, 0, 0))).await.unwrap();

    let stored = store.stored_candles(&btc).await;
    assert_eq!(stored, fixtures::minute_candles(at(10, 0, 0), 3));
    assert_eq!(
        report.checkpoint,
        Some(Checkpoint::Candle {
            period_start: at(10, 2, 0)
        })
    );
    assert_eq!(report.next_cursor, Cursor::time(at(10, 3, 0)));
    assert_eq!(report.records_persisted, 3);
    assert_eq!(report.records_withheld, 1);
    assert_eq!(report.batches_committed, 1);
    assert_eq!(report.drained, DrainReason::EmptyPage);

    // The second request starts at the withheld minute, not after it.
    let cursors: Vec<_> = script.requests().await.iter().map(|r| r.cursor).collect();
    assert_eq!(
        cursors,
        vec![Cursor::time(at(10, 0, 0)), Cursor::time(at(10, 3, 0))]
    );
}

#[tokio::test(start_paused = true)]
async fn empty_page_leaves_checkpoint_untouched() {
    let (source, script) = ScriptedSource::new_with_controller("scripted");
    let store = Arc::new(MemoryStore::new());
    let btc = sym(BTC);
    let stored = Checkpoint::Candle {
        period_start: at(9, 59, 0),
    };
    store.seed_checkpoint(&btc, stored).await;

    let report = harvester(source, store.clone())
        .ingest_candles(&btc, at(0, 0, 0))
        .await
        .unwrap();

    assert_eq!(report.drained, DrainReason::EmptyPage);
    assert_eq!(report.checkpoint, Some(stored));
    assert_eq!(report.started_at, Cursor::time(at(10, 0, 0)));
    assert_eq!(report.next_cursor, Cursor::time(at(10, 0, 0)));
    assert_eq!(report.pages_fetched, 1);
    assert_eq!(store.commits().await, 0);
    assert_eq!(
        store.last_checkpoint(&btc, Dataset::Candles).await.unwrap(),
        Some(stored)
    );
    assert_eq!(script.requests().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn only_open_candle_drains_as_awaiting_close() {
    let (source, script) = ScriptedSource::new_with_controller("scripted");
    let store = Arc::new(MemoryStore::new());
    let btc = sym(BTC);
    for server_time in [at(10, 0, 20), at(10, 0, 40)] {
        script
            .push_candles(
                &btc,
                MockBehavior::Return(fetched(vec![fixtures::candle(at(10, 0, 0))], server_time, 2)),
            )
            .await;
    }

    let report = builder(source, store.clone())
        .max_withheld_refetches(1)
        .build()
        .unwrap()
        .ingest(&btc, Cursor::time(at(10, 0, 0)))
        .await
        .unwrap();

    assert_eq!(report.drained, DrainReason::AwaitingClose);
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.records_persisted, 0);
    assert_eq!(report.records_withheld, 2);
    assert_eq!(report.checkpoint, None);
    assert_eq!(report.next_cursor, Cursor::time(at(10, 0, 0)));
    assert_eq!(store.commits().await, 0);
    // Both requests used the same cursor.
    assert!(
        script
            .requests()
            .await
            .iter()
            .all(|r| r.cursor == Cursor::time(at(10, 0, 0)))
    );
}

#[tokio::test(start_paused = true)]
async fn withheld_candle_is_stored_once_its_minute_closes() {
    let (source, script) = ScriptedSource::new_with_controller("scripted");
    let store = Arc::new(MemoryStore::new());
    let btc = sym(BTC);
    script
        .push_candles(
            &btc,
            MockBehavior::Return(fetched(vec![fixtures::candle(at(10, 0, 0))], at(10, 0, 50), 2)),
        )
        .await;
    script
        .push_candles(
            &btc,
            MockBehavior::Return(fetched(
                fixtures::minute_candles(at(10, 0, 0), 2),
                at(10, 1, 5),
                4,
            )),
        )
        .await;

    let report = harvester(source, store.clone())
        .ingest(&btc, Cursor::time(at(10, 0, 0)))
        .await
        .unwrap();

    assert_eq!(store.stored_candles(&btc).await, vec![fixtures::candle(at(10, 0, 0))]);
    assert_eq!(report.records_persisted, 1);
    assert_eq!(report.next_cursor, Cursor::time(at(10, 1, 0)));
}

#[tokio::test(start_paused = true)]
async fn start_hint_is_floored_to_its_minute() {
    let (source, script) = ScriptedSource::new_with_controller("scripted");
    let store = Arc::new(MemoryStore::new());

    harvester(source, store)
        .ingest_candles(&sym(ETH), at(12, 34, 56))
        .await
        .unwrap();

    assert_eq!(
        script.requests().await[0].cursor,
        Cursor::time(at(12, 34, 0))
    );
}

#[tokio::test(start_paused = true)]
async fn page_before_cursor_is_rejected_without_writing() {
    let (source, script) = ScriptedSource::new_with_controller("scripted");
    let store = Arc::new(MemoryStore::new());
    let btc = sym(BTC);
    store
        .seed_checkpoint(
            &btc,
            Checkpoint::Candle {
                period_start: at(10, 5, 0),
            },
        )
        .await;
    script
        .push_candles(
            &btc,
            MockBehavior::Return(fetched(
                fixtures::minute_candles(at(10, 4, 0), 3),
                at(11, 0, 0),
                2,
            )),
        )
        .await;

    let err = harvester(source, store.clone())
        .ingest(&btc, Cursor::time(at(0, 0, 0)))
        .await
        .unwrap_err();

    assert!(matches!(err, harvest::HarvestError::OutOfOrder(_)));
    assert_eq!(err.kind(), harvest::ErrorKind::Protocol);
    assert_eq!(store.commits().await, 0);
}

#[tokio::test(start_paused = true)]
async fn minute_gaps_in_candles_are_accepted() {
    let (source, script) = ScriptedSource::new_with_controller("scripted");
    let store = Arc::new(MemoryStore::new());
    let btc = sym(BTC);
    let sparse = vec![
        fixtures::candle(at(10, 0, 0)),
        fixtures::candle(at(10, 1, 0)),
        fixtures::candle(at(10, 0, 0) + TimeDelta::minutes(5)),
    ];
    script
        .push_candles(
            &btc,
            MockBehavior::Return(fetched(sparse.clone(), at(11, 0, 0), 2)),
        )
        .await;

    let report = harvester(source, store.clone())
        .ingest(&btc, Cursor::time(at(10, 0, 0)))
        .await
        .unwrap();

    assert_eq!(store.stored_candles(&btc).await, sparse);
    assert_eq!(report.next_cursor, Cursor::time(at(10, 6, 0)));
}
