use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{Candle, Checkpoint, Dataset, HarvestError, Symbol, Trade};

/// A finalized batch handed to the store in one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteBatch<'a> {
    /// Closed candles, ascending by `period_start`.
    Candles(&'a [Candle]),
    /// Trades, ascending and contiguous by `trade_id`.
    Trades(&'a [Trade]),
}

impl WriteBatch<'_> {
    /// Dataset of the records in this batch.
    #[must_use]
    pub const fn dataset(&self) -> Dataset {
        match self {
            Self::Candles(_) => Dataset::Candles,
            Self::Trades(_) => Dataset::Trades,
        }
    }

    /// Number of records.
    #[must_use]
    pub const fn len(&self) -> usize {
        match self {
            Self::Candles(c) => c.len(),
            Self::Trades(t) => t.len(),
        }
    }

    /// True when the batch holds no records.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Durable store of ingested records and their per-symbol checkpoints.
///
/// Only `last_checkpoint` and `append_and_checkpoint` are required by the
/// ingestion loop. The read-back and discovery methods default to
/// `Unsupported` so minimal stores can skip them.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Stable name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Checkpoint of the last committed record for `symbol`, if any.
    async fn last_checkpoint(
        &self,
        symbol: &Symbol,
        dataset: Dataset,
    ) -> Result<Option<Checkpoint>, HarvestError>;

    /// Append `batch` and move the checkpoint to `checkpoint` atomically.
    ///
    /// Either both the rows and the checkpoint become durable or neither does.
    /// Implementations must reject a checkpoint that is not strictly after the
    /// stored one with `CheckpointRegression`.
    async fn append_and_checkpoint(
        &self,
        symbol: &Symbol,
        batch: WriteBatch<'_>,
        checkpoint: Checkpoint,
    ) -> Result<(), HarvestError>;

    /// Symbols that already have stored records for `dataset`.
    async fn symbols(&self, _dataset: Dataset) -> Result<Vec<Symbol>, HarvestError> {
        Err(HarvestError::unsupported("store/symbols"))
    }

    /// Stored candles opening at or after `from`, ascending.
    async fn candles_since(
        &self,
        _symbol: &Symbol,
        _from: DateTime<Utc>,
    ) -> Result<Vec<Candle>, HarvestError> {
        Err(HarvestError::unsupported("store/candles_since"))
    }

    /// Stored trades with ids at or after `from_id`, ascending.
    async fn trades_from(
        &self,
        _symbol: &Symbol,
        _from_id: u64,
    ) -> Result<Vec<Trade>, HarvestError> {
        Err(HarvestError::unsupported("store/trades_from"))
    }
}
