//! Per-dataset behavior the ingestion loop is generic over.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;

use crate::boundary::{Classified, classify_candles, classify_trades};
use crate::source::PageSource;
use crate::store::WriteBatch;
use crate::validate::{validate_candles, validate_trades};
use crate::{Candle, Checkpoint, Cursor, Dataset, Fetched, HarvestError, Symbol, Trade};

/// A record type the engine can page through, classify, and persist.
pub trait Record: Clone + Send + Sync + 'static {
    /// Dataset this record type belongs to.
    const DATASET: Dataset;

    /// Checkpoint that marks this record as the last one stored.
    fn checkpoint(&self) -> Checkpoint;

    /// Fetch one page starting at `cursor`.
    fn fetch<'a>(
        source: &'a dyn PageSource,
        symbol: &'a Symbol,
        cursor: Cursor,
        limit: u32,
    ) -> BoxFuture<'a, Result<Fetched<Self>, HarvestError>>;

    /// Split a page into finalized and withheld records.
    fn classify(page: &[Self], server_time: DateTime<Utc>) -> Classified<'_, Self>;

    /// Check ordering and contiguity of a finalized batch against its cursor.
    ///
    /// # Errors
    /// Returns a protocol error when the batch breaks the dataset's ordering rules.
    fn validate(batch: &[Self], cursor: &Cursor, anchored: bool) -> Result<(), HarvestError>;

    /// Borrow a finalized batch for the store.
    fn write_batch(batch: &[Self]) -> WriteBatch<'_>;
}

fn cursor_mismatch(dataset: Dataset, cursor: Cursor) -> HarvestError {
    HarvestError::InvalidArg(format!("{dataset} cannot be fetched with {cursor}"))
}

impl Record for Candle {
    const DATASET: Dataset = Dataset::Candles;

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint::Candle {
            period_start: self.period_start,
        }
    }

    fn fetch<'a>(
        source: &'a dyn PageSource,
        symbol: &'a Symbol,
        cursor: Cursor,
        limit: u32,
    ) -> BoxFuture<'a, Result<Fetched<Self>, HarvestError>> {
        match cursor {
            Cursor::Time { next_period_start } => {
                source.candles(symbol, next_period_start, limit)
            }
            other => Box::pin(async move { Err(cursor_mismatch(Self::DATASET, other)) }),
        }
    }

    fn classify(page: &[Self], server_time: DateTime<Utc>) -> Classified<'_, Self> {
        classify_candles(page, server_time)
    }

    fn validate(batch: &[Self], cursor: &Cursor, _anchored: bool) -> Result<(), HarvestError> {
        validate_candles(batch, cursor)
    }

    fn write_batch(batch: &[Self]) -> WriteBatch<'_> {
        WriteBatch::Candles(batch)
    }
}

impl Record for Trade {
    const DATASET: Dataset = Dataset::Trades;

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint::Trade {
            trade_id: self.trade_id,
        }
    }

    fn fetch<'a>(
        source: &'a dyn PageSource,
        symbol: &'a Symbol,
        cursor: Cursor,
        limit: u32,
    ) -> BoxFuture<'a, Result<Fetched<Self>, HarvestError>> {
        match cursor {
            Cursor::Id { next_trade_id } => source.trades(symbol, next_trade_id, limit),
            other => Box::pin(async move { Err(cursor_mismatch(Self::DATASET, other)) }),
        }
    }

    fn classify(page: &[Self], _server_time: DateTime<Utc>) -> Classified<'_, Self> {
        classify_trades(page)
    }

    fn validate(batch: &[Self], cursor: &Cursor, anchored: bool) -> Result<(), HarvestError> {
        validate_trades(batch, cursor, anchored)
    }

    fn write_batch(batch: &[Self]) -> WriteBatch<'_> {
        WriteBatch::Trades(batch)
    }
}
