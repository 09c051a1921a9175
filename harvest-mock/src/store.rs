use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use harvest_core::{
    Candle, Checkpoint, CheckpointStore, Dataset, HarvestError, Symbol, Trade, WriteBatch,
};

#[derive(Default)]
struct StoreState {
    candles: HashMap<Symbol, Vec<Candle>>,
    trades: HashMap<Symbol, Vec<Trade>>,
    checkpoints: HashMap<(Symbol, Dataset), Checkpoint>,
    commits: u64,
    // Commits still allowed before every further commit fails.
    commits_before_failure: Option<u64>,
    fail_reads: bool,
}

/// In-memory [`CheckpointStore`] with commit counting and failure injection.
///
/// Each commit applies its rows and checkpoint under one lock, so a failed
/// commit leaves no trace.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `n` more commits succeed, then fail every commit after them.
    pub async fn fail_commits_after(&self, n: u64) {
        self.state.lock().await.commits_before_failure = Some(n);
    }

    /// Make `last_checkpoint` fail until cleared.
    pub async fn fail_reads(&self, fail: bool) {
        self.state.lock().await.fail_reads = fail;
    }

    /// Clear all injected failures.
    pub async fn heal(&self) {
        let mut guard = self.state.lock().await;
        guard.commits_before_failure = None;
        guard.fail_reads = false;
    }

    /// Store a checkpoint without rows, as if an earlier process had run.
    pub async fn seed_checkpoint(&self, symbol: &Symbol, checkpoint: Checkpoint) {
        self.state
            .lock()
            .await
            .checkpoints
            .insert((symbol.clone(), checkpoint.dataset()), checkpoint);
    }

    /// Number of successful commits.
    pub async fn commits(&self) -> u64 {
        self.state.lock().await.commits
    }

    /// All stored candles for `symbol`.
    pub async fn stored_candles(&self, symbol: &Symbol) -> Vec<Candle> {
        let guard = self.state.lock().await;
        guard.candles.get(symbol).cloned().unwrap_or_default()
    }

    /// All stored trades for `symbol`.
    pub async fn stored_trades(&self, symbol: &Symbol) -> Vec<Trade> {
        let guard = self.state.lock().await;
        guard.trades.get(symbol).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryStore {
    fn name(&self) -> &'static str {
        "harvest-mock-store"
    }

    async fn last_checkpoint(
        &self,
        symbol: &Symbol,
        dataset: Dataset,
    ) -> Result<Option<Checkpoint>, HarvestError> {
        let guard = self.state.lock().await;
        if guard.fail_reads {
            return Err(HarvestError::persistence("injected read failure"));
        }
        Ok(guard.checkpoints.get(&(symbol.clone(), dataset)).copied())
    }

    async fn append_and_checkpoint(
        &self,
        symbol: &Symbol,
        batch: WriteBatch<'_>,
        checkpoint: Checkpoint,
    ) -> Result<(), HarvestError> {
        if batch.dataset() != checkpoint.dataset() {
            return Err(HarvestError::InvalidArg(format!(
                "{} batch committed with {checkpoint}",
                batch.dataset()
            )));
        }
        let mut guard = self.state.lock().await;
        if let Some(left) = guard.commits_before_failure {
            if left == 0 {
                return Err(HarvestError::persistence("injected commit failure"));
            }
            guard.commits_before_failure = Some(left - 1);
        }
        let key = (symbol.clone(), checkpoint.dataset());
        if let Some(stored) = guard.checkpoints.get(&key)
            && !checkpoint.is_after(stored)
        {
            return Err(HarvestError::CheckpointRegression {
                stored: stored.to_string(),
                attempted: checkpoint.to_string(),
            });
        }
        match batch {
            WriteBatch::Candles(rows) => guard
                .candles
                .entry(symbol.clone())
                .or_default()
                .extend_from_slice(rows),
            WriteBatch::Trades(rows) => guard
                .trades
                .entry(symbol.clone())
                .or_default()
                .extend_from_slice(rows),
        }
        guard.checkpoints.insert(key, checkpoint);
        guard.commits += 1;
        Ok(())
    }

    async fn symbols(&self, dataset: Dataset) -> Result<Vec<Symbol>, HarvestError> {
        let guard = self.state.lock().await;
        let known: BTreeSet<Symbol> = guard
            .checkpoints
            .keys()
            .filter(|(_, d)| *d == dataset)
            .map(|(s, _)| s.clone())
            .collect();
        Ok(known.into_iter().collect())
    }

    async fn candles_since(
        &self,
        symbol: &Symbol,
        from: DateTime<Utc>,
    ) -> Result<Vec<Candle>, HarvestError> {
        let guard = self.state.lock().await;
        Ok(guard
            .candles
            .get(symbol)
            .map(|rows| rows.iter().filter(|c| c.period_start >= from).cloned().collect())
            .unwrap_or_default())
    }

    async fn trades_from(&self, symbol: &Symbol, from_id: u64) -> Result<Vec<Trade>, HarvestError> {
        let guard = self.state.lock().await;
        Ok(guard
            .trades
            .get(symbol)
            .map(|rows| rows.iter().filter(|t| t.trade_id >= from_id).cloned().collect())
            .unwrap_or_default())
    }
}
