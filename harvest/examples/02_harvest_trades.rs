mod common;

use std::sync::Arc;

use harvest::{Cursor, Harvester, Symbol, sql};
use harvest_mock::MemoryStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    common::init_tracing();
    let symbols = [Symbol::new("BTCUSDT")?, Symbol::new("ETHUSDT")?];
    let source = common::get_source(&symbols).await?;
    let store = Arc::new(MemoryStore::new());

    let harvester = Harvester::builder()
        .with_source(source)
        .with_store(store.clone())
        .page_limits(1500, 200)
        .max_pages_per_run(3)
        .max_concurrent_symbols(2)
        .build()?;

    let report = harvester
        .harvest()
        .symbols(&symbols)?
        .start(Cursor::id(1))
        .run()
        .await?;

    for r in &report.reports {
        println!("{}: {} trades, next {}", r.symbol, r.records_persisted, r.next_cursor);
    }
    for f in &report.failures {
        eprintln!("{}: {}", f.symbol, f.error);
    }

    // What a MySQL-backed store would execute for the last commit of each symbol.
    for symbol in &symbols {
        let trades = store.stored_trades(symbol).await;
        if let Some(last) = trades.last() {
            let tail = &trades[trades.len().saturating_sub(3)..];
            let checkpoint = harvest::Checkpoint::Trade {
                trade_id: last.trade_id,
            };
            for stmt in sql::commit_statements(symbol, harvest::WriteBatch::Trades(tail), &checkpoint) {
                println!("{} -- {} params", stmt.sql, stmt.params.len());
            }
        }
    }
    Ok(())
}
