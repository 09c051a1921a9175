//! Harvest pulls market data from a rate-limited, cursor-paginated remote API
//! into a durable store, and picks up where it left off after any stop.
//!
//! Overview
//! - Walks one symbol at a time through one-minute candles (`startTime`
//!   cursor) or trades (`fromId` cursor) until the remote side runs dry.
//! - Every request passes a shared [`BudgetGovernor`] that paces against the
//!   weight the server reports, and waits for the server's window to reset
//!   once the budget is spent.
//! - Only records that can no longer change are stored. The candle for the
//!   server's current minute is held back until that minute has closed.
//! - Each page's rows and the symbol's checkpoint are committed as one unit,
//!   so a restart never duplicates or skips a record.
//!
//! Key behaviors and trade-offs
//! - Ingestion of a symbol is strictly sequential: fetch, classify, persist,
//!   advance. Concurrency only exists across symbols and is bounded by
//!   `max_concurrent_symbols`.
//! - Transport failures are retried with jittered exponential backoff, each
//!   attempt re-admitted by the governor. A 418/429 trips the governor for
//!   every symbol, not just the one that hit it.
//! - Protocol violations (gaps, out-of-order pages, bad payloads) end the run
//!   without touching the store.
//!
//! Examples
//! ```rust,ignore
//! use std::sync::Arc;
//! use harvest::{Cursor, Harvester, Symbol};
//! use harvest_binance::{BinanceConfig, BinanceConnector};
//!
//! let binance = Arc::new(BinanceConnector::new(&BinanceConfig::with_api_key("..."))?);
//! let harvester = Harvester::builder()
//!     .with_source(binance)
//!     .with_store(store)
//!     .build()?;
//!
//! let btc = Symbol::new("BTCUSDT")?;
//! let report = harvester.ingest(&btc, Cursor::time(start)).await?;
//! println!("stored {} candles, next {}", report.records_persisted, report.next_cursor);
//! ```
//!
//! Multi-symbol harvest:
//! ```rust,ignore
//! let report = harvester
//!     .harvest()
//!     .symbols(&[Symbol::new("BTCUSDT")?, Symbol::new("ETHUSDT")?])?
//!     .start(Cursor::id(1))
//!     .run()
//!     .await?;
//! for failure in &report.failures {
//!     eprintln!("{}: {}", failure.symbol, failure.error);
//! }
//! ```
//!
//! See `harvest/examples/` for a runnable backfill against Binance futures.
#![warn(missing_docs)]

pub(crate) mod core;
mod harvest;
mod ingest;
/// SQL rendering for MySQL-backed stores.
pub mod sql;
mod writer;

pub use crate::core::{Harvester, HarvesterBuilder};
pub use crate::harvest::HarvestBuilder;
pub use crate::writer::BatchWriter;

pub use harvest_middleware::{BudgetGovernor, GovernedSource, admission_wait, window_reset};

// Re-export core types for convenience
pub use harvest_core::{
    BudgetObservation, BudgetState, Candle, Checkpoint, CheckpointStore, Cursor, Dataset,
    DrainReason, ErrorKind, ErrorPolicy, Fetched, GovernorConfig, HarvestConfig, HarvestError,
    HarvestReport, IngestReport, Page, PageSource, Record, RetryConfig, Symbol, SymbolFailure,
    Trade, WriteBatch,
};
