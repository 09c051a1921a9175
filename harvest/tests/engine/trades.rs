use std::sync::Arc;

use harvest::{Checkpoint, Cursor, DrainReason, HarvestError};
use harvest_mock::MemoryStore;

use crate::helpers::*;

#[tokio::test(start_paused = true)]
async fn trades_are_stored_contiguously_across_pages() {
    let (source, script) = ScriptedSource::new_with_controller("scripted");
    let store = Arc::new(MemoryStore::new());
    let eth = sym(ETH);
    script
        .push_trades(
            &eth,
            MockBehavior::Return(fetched(fixtures::contiguous_trades(100, at(8, 0, 0), 3), at(8, 1, 0), 20)),
        )
        .await;
    script
        .push_trades(
            &eth,
            MockBehavior::Return(fetched(fixtures::contiguous_trades(103, at(8, 0, 3), 2), at(8, 1, 1), 40)),
        )
        .await;

    let report = harvester(source, store.clone())
        .ingest_trades(&eth, 100)
        .await
        .unwrap();

    let ids: Vec<u64> = store
        .stored_trades(&eth)
        .await
        .iter()
        .map(|t| t.trade_id)
        .collect();
    assert_eq!(ids, (100..=104).collect::<Vec<_>>());
    assert_eq!(report.checkpoint, Some(Checkpoint::Trade { trade_id: 104 }));
    assert_eq!(report.next_cursor, Cursor::id(105));
    assert_eq!(report.batches_committed, 2);
    assert_eq!(report.records_withheld, 0);
    assert_eq!(report.drained, DrainReason::EmptyPage);

    let cursors: Vec<_> = script.requests().await.iter().map(|r| r.cursor).collect();
    assert_eq!(cursors, vec![Cursor::id(100), Cursor::id(103), Cursor::id(105)]);
}

#[tokio::test(start_paused = true)]
async fn first_page_may_start_after_an_unanchored_hint() {
    let (source, script) = ScriptedSource::new_with_controller("scripted");
    let store = Arc::new(MemoryStore::new());
    let eth = sym(ETH);
    // History before id 50 has been pruned remotely.
    script
        .push_trades(
            &eth,
            MockBehavior::Return(fetched(fixtures::contiguous_trades(50, at(8, 0, 0), 2), at(8, 1, 0), 2)),
        )
        .await;

    let report = harvester(source, store.clone())
        .ingest_trades(&eth, 1)
        .await
        .unwrap();

    assert_eq!(report.records_persisted, 2);
    assert_eq!(report.next_cursor, Cursor::id(52));
}

#[tokio::test(start_paused = true)]
async fn gap_after_checkpoint_aborts_and_keeps_earlier_commits() {
    let (source, script) = ScriptedSource::new_with_controller("scripted");
    let store = Arc::new(MemoryStore::new());
    let eth = sym(ETH);
    script
        .push_trades(
            &eth,
            MockBehavior::Return(fetched(fixtures::contiguous_trades(1, at(8, 0, 0), 3), at(8, 1, 0), 2)),
        )
        .await;
    script
        .push_trades(
            &eth,
            MockBehavior::Return(fetched(fixtures::contiguous_trades(5, at(8, 0, 5), 2), at(8, 1, 1), 4)),
        )
        .await;

    let h = harvester(source, store.clone());
    let err = h.ingest_trades(&eth, 1).await.unwrap_err();

    assert_eq!(err, HarvestError::Gap { expected: 4, found: 5 });
    assert_eq!(store.stored_trades(&eth).await.len(), 3);
    assert_eq!(store.commits().await, 1);

    // A later run resumes right after the last commit.
    let report = h.ingest_trades(&eth, 1).await.unwrap();
    assert_eq!(report.started_at, Cursor::id(4));
    assert_eq!(report.checkpoint, Some(Checkpoint::Trade { trade_id: 3 }));
}

#[tokio::test(start_paused = true)]
async fn duplicate_ids_in_a_page_are_out_of_order() {
    let (source, script) = ScriptedSource::new_with_controller("scripted");
    let store = Arc::new(MemoryStore::new());
    let eth = sym(ETH);
    let mut page = fixtures::contiguous_trades(10, at(8, 0, 0), 2);
    page.push(page[1].clone());
    script
        .push_trades(&eth, MockBehavior::Return(fetched(page, at(8, 1, 0), 2)))
        .await;

    let err = harvester(source, store.clone())
        .ingest_trades(&eth, 10)
        .await
        .unwrap_err();

    assert!(matches!(err, HarvestError::OutOfOrder(_)));
    assert_eq!(store.commits().await, 0);
}

#[tokio::test(start_paused = true)]
async fn page_cap_stops_a_long_backfill() {
    let (source, script) = ScriptedSource::new_with_controller("scripted");
    let store = Arc::new(MemoryStore::new());
    let eth = sym(ETH);
    for first in [1, 3, 5] {
        script
            .push_trades(
                &eth,
                MockBehavior::Return(fetched(fixtures::contiguous_trades(first, at(8, 0, 0), 2), at(8, 1, 0), 2)),
            )
            .await;
    }

    let report = builder(source, store.clone())
        .max_pages_per_run(2)
        .build()
        .unwrap()
        .ingest_trades(&eth, 1)
        .await
        .unwrap();

    assert_eq!(report.drained, DrainReason::PageCap);
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.next_cursor, Cursor::id(5));
    assert_eq!(script.requests().await.len(), 2);
    assert_eq!(script.pending().await, 1);
}

#[tokio::test(start_paused = true)]
async fn rate_limit_stops_the_run_at_last_commit() {
    let (source, script) = ScriptedSource::new_with_controller("scripted");
    let store = Arc::new(MemoryStore::new());
    let eth = sym(ETH);
    script
        .push_trades(
            &eth,
            MockBehavior::Return(fetched(fixtures::contiguous_trades(1, at(8, 0, 0), 2), at(8, 1, 0), 2)),
        )
        .await;
    script
        .push_trades(
            &eth,
            MockBehavior::Fail(HarvestError::RateLimited {
                status: 418,
                retry_after_ms: Some(120_000),
            }),
        )
        .await;

    let h = harvester(source, store.clone());
    let err = h.ingest_trades(&eth, 1).await.unwrap_err();
    assert!(matches!(err, HarvestError::RateLimited { status: 418, .. }));
    assert_eq!(err.policy(), harvest::ErrorPolicy::Stop);
    assert_eq!(store.stored_trades(&eth).await.len(), 2);

    // The shared governor now refuses without calling out.
    let err = h.ingest_trades(&eth, 1).await.unwrap_err();
    assert!(matches!(err, HarvestError::Banned { .. }));
    assert_eq!(script.requests().await.len(), 2);
}
