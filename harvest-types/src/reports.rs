//! Report envelopes produced by ingestion runs.

use serde::{Deserialize, Serialize};

use crate::cursor::{Checkpoint, Cursor};
use crate::error::HarvestError;
use crate::market::{Dataset, Symbol};

/// Why an ingestion run stopped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum DrainReason {
    /// The remote API returned an empty page: the stored record is caught up.
    EmptyPage,
    /// The only record left is a candle whose minute has not closed yet.
    AwaitingClose,
    /// The configured per-run page cap was reached.
    PageCap,
}

/// Outcome of one successful `ingest` call for a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Symbol that was ingested.
    pub symbol: Symbol,
    /// Dataset that was walked.
    pub dataset: Dataset,
    /// Cursor the run started from.
    pub started_at: Cursor,
    /// Cursor the next run will start from.
    pub next_cursor: Cursor,
    /// Checkpoint after the run; `None` when nothing has ever been stored.
    pub checkpoint: Option<Checkpoint>,
    /// Remote pages fetched, including the terminal one.
    pub pages_fetched: u64,
    /// Batches committed to the store.
    pub batches_committed: u64,
    /// Records committed to the store.
    pub records_persisted: u64,
    /// Trailing records held back because they could still change.
    pub records_withheld: u64,
    /// Why the run ended.
    pub drained: DrainReason,
}

/// Per-symbol failure inside a multi-symbol harvest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolFailure {
    /// Symbol whose run failed.
    pub symbol: Symbol,
    /// Error that ended the run. Its checkpoint stays at the last commit.
    pub error: HarvestError,
}

/// Summary of a multi-symbol harvest.
///
/// One symbol failing does not abort the others; failures are collected here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HarvestReport {
    /// Reports of symbols that drained cleanly, in request order.
    pub reports: Vec<IngestReport>,
    /// Symbols whose runs failed, in request order.
    pub failures: Vec<SymbolFailure>,
}

impl HarvestReport {
    /// True when every symbol drained cleanly.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Total records committed across all symbols.
    #[must_use]
    pub fn records_persisted(&self) -> u64 {
        self.reports.iter().map(|r| r.records_persisted).sum()
    }

    /// Collapse failures into one aggregate error, if any occurred.
    #[must_use]
    pub fn into_error(self) -> Option<HarvestError> {
        if self.failures.is_empty() {
            None
        } else {
            Some(HarvestError::SymbolsFailed(
                self.failures.into_iter().map(|f| f.error).collect(),
            ))
        }
    }
}
