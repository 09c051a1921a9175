use std::sync::Arc;

use chrono::{DateTime, Utc};
use harvest_core::{
    Candle, CheckpointStore, Cursor, Dataset, HarvestError, PageSource, Symbol, Trade,
};
use harvest_middleware::{BudgetGovernor, GovernedSource};
use harvest_types::{GovernorConfig, HarvestConfig, HarvestReport, IngestReport, RetryConfig};

use crate::harvest::HarvestBuilder;
use crate::ingest::IngestRun;
use crate::writer::BatchWriter;

/// Ingestion engine bound to one remote source and one store.
///
/// Every remote call goes through a shared [`BudgetGovernor`]. Clones of the
/// engine, and every symbol task a multi-symbol harvest spawns, contend for
/// that same governor.
#[derive(Clone)]
pub struct Harvester {
    pub(crate) source: Arc<dyn PageSource>,
    pub(crate) writer: BatchWriter,
    pub(crate) governor: Arc<BudgetGovernor>,
    pub(crate) cfg: HarvestConfig,
}

/// Builder for constructing a [`Harvester`] with custom configuration.
pub struct HarvesterBuilder {
    source: Option<Arc<dyn PageSource>>,
    store: Option<Arc<dyn CheckpointStore>>,
    governor: Option<Arc<BudgetGovernor>>,
    cfg: HarvestConfig,
}

impl Default for HarvesterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HarvesterBuilder {
    /// Create a new builder with default limits and no collaborators.
    #[must_use]
    pub fn new() -> Self {
        Self {
            source: None,
            store: None,
            governor: None,
            cfg: HarvestConfig::default(),
        }
    }

    /// Remote page source. It is wrapped behind the governor at build time.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn PageSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Durable store for records and checkpoints.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Share an existing governor, e.g. with another engine that talks to the
    /// same API key. The governor's own limits take precedence over
    /// [`HarvesterBuilder::governor_config`].
    #[must_use]
    pub fn with_governor(mut self, governor: Arc<BudgetGovernor>) -> Self {
        self.governor = Some(governor);
        self
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, cfg: HarvestConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Limits for the governor created at build time.
    #[must_use]
    pub const fn governor_config(mut self, cfg: GovernorConfig) -> Self {
        self.cfg.governor = cfg;
        self
    }

    /// Retry policy for transient transport failures.
    #[must_use]
    pub const fn retry(mut self, cfg: RetryConfig) -> Self {
        self.cfg.retry = cfg;
        self
    }

    /// Page sizes sent with candle and trade requests.
    #[must_use]
    pub const fn page_limits(mut self, candles: u32, trades: u32) -> Self {
        self.cfg.candle_page_limit = candles;
        self.cfg.trade_page_limit = trades;
        self
    }

    /// Re-requests of a page holding only an unclosed candle before draining.
    #[must_use]
    pub const fn max_withheld_refetches(mut self, n: u32) -> Self {
        self.cfg.max_withheld_refetches = n;
        self
    }

    /// Stop a single `ingest` call after this many pages.
    #[must_use]
    pub const fn max_pages_per_run(mut self, pages: u64) -> Self {
        self.cfg.max_pages_per_run = Some(pages);
        self
    }

    /// Upper bound on symbols ingested at once by a multi-symbol harvest.
    #[must_use]
    pub const fn max_concurrent_symbols(mut self, n: usize) -> Self {
        self.cfg.max_concurrent_symbols = n;
        self
    }

    /// Build the engine.
    ///
    /// # Errors
    /// Returns `InvalidArg` when the source or store is missing, or when a
    /// page limit, the page cap, or the symbol concurrency is zero.
    pub fn build(self) -> Result<Harvester, HarvestError> {
        let source = self
            .source
            .ok_or_else(|| HarvestError::InvalidArg("no page source configured".into()))?;
        let store = self
            .store
            .ok_or_else(|| HarvestError::InvalidArg("no checkpoint store configured".into()))?;
        if self.cfg.candle_page_limit == 0 || self.cfg.trade_page_limit == 0 {
            return Err(HarvestError::InvalidArg("page limit must be > 0".into()));
        }
        if self.cfg.max_pages_per_run == Some(0) {
            return Err(HarvestError::InvalidArg("max_pages_per_run must be > 0".into()));
        }
        if self.cfg.max_concurrent_symbols == 0 {
            return Err(HarvestError::InvalidArg(
                "max_concurrent_symbols must be > 0".into(),
            ));
        }
        if self.cfg.governor.max_weight == 0 {
            return Err(HarvestError::InvalidArg("max_weight must be > 0".into()));
        }
        let governor = self
            .governor
            .unwrap_or_else(|| Arc::new(BudgetGovernor::new(self.cfg.governor)));
        let governed: Arc<dyn PageSource> = Arc::new(GovernedSource::new(
            source,
            Arc::clone(&governor),
            self.cfg.retry,
        ));
        Ok(Harvester {
            source: governed,
            writer: BatchWriter::new(store),
            governor,
            cfg: self.cfg,
        })
    }
}

impl Harvester {
    /// Start building a new engine.
    #[must_use]
    pub fn builder() -> HarvesterBuilder {
        HarvesterBuilder::new()
    }

    /// Shared budget governor.
    #[must_use]
    pub const fn governor(&self) -> &Arc<BudgetGovernor> {
        &self.governor
    }

    /// Effective configuration.
    #[must_use]
    pub const fn config(&self) -> &HarvestConfig {
        &self.cfg
    }

    /// Store the engine persists into.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CheckpointStore> {
        self.writer.store()
    }

    /// Ingest one symbol until the remote dataset is drained.
    ///
    /// `start_hint` is used only when the store holds no checkpoint for the
    /// symbol; otherwise the run resumes right after the stored record. Its
    /// variant selects the dataset.
    ///
    /// # Errors
    /// Any fetch, validation, or persistence failure ends the run. Everything
    /// committed before the failure stays committed and the next call resumes
    /// from it.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "harvest::ingest",
            skip(self, symbol),
            fields(symbol = %symbol, hint = %start_hint),
        )
    )]
    pub async fn ingest(
        &self,
        symbol: &Symbol,
        start_hint: Cursor,
    ) -> Result<IngestReport, HarvestError> {
        match start_hint {
            Cursor::Time { .. } => IngestRun::<Candle>::new(self, symbol, start_hint).run().await,
            Cursor::Id { .. } => IngestRun::<Trade>::new(self, symbol, start_hint).run().await,
        }
    }

    /// Ingest one-minute candles, starting at `start` for a new symbol.
    ///
    /// # Errors
    /// See [`Harvester::ingest`].
    pub async fn ingest_candles(
        &self,
        symbol: &Symbol,
        start: DateTime<Utc>,
    ) -> Result<IngestReport, HarvestError> {
        self.ingest(symbol, Cursor::time(start)).await
    }

    /// Ingest trades, starting at `from_id` for a new symbol.
    ///
    /// # Errors
    /// See [`Harvester::ingest`].
    pub async fn ingest_trades(
        &self,
        symbol: &Symbol,
        from_id: u64,
    ) -> Result<IngestReport, HarvestError> {
        self.ingest(symbol, Cursor::id(from_id)).await
    }

    /// Builder for a concurrent multi-symbol harvest.
    #[must_use]
    pub const fn harvest(&self) -> HarvestBuilder<'_> {
        HarvestBuilder::new(self)
    }

    /// Harvest every symbol the store already tracks for the hint's dataset.
    ///
    /// A store that tracks nothing yields an empty report.
    ///
    /// # Errors
    /// Returns the store's error if it cannot list its symbols.
    pub async fn harvest_tracked(&self, start_hint: Cursor) -> Result<HarvestReport, HarvestError> {
        let symbols = self.store().symbols(start_hint.dataset()).await?;
        if symbols.is_empty() {
            return Ok(HarvestReport::default());
        }
        self.harvest().symbols(&symbols)?.start(start_hint).run().await
    }

    /// Stored candles opening at or after `from`, ascending.
    ///
    /// # Errors
    /// Returns the store's error, or `Unsupported` if it has no read-back.
    pub async fn candles_since(
        &self,
        symbol: &Symbol,
        from: DateTime<Utc>,
    ) -> Result<Vec<Candle>, HarvestError> {
        self.store().candles_since(symbol, from).await
    }

    /// Stored trades with ids at or after `from_id`, ascending.
    ///
    /// # Errors
    /// Returns the store's error, or `Unsupported` if it has no read-back.
    pub async fn trades_from(
        &self,
        symbol: &Symbol,
        from_id: u64,
    ) -> Result<Vec<Trade>, HarvestError> {
        self.store().trades_from(symbol, from_id).await
    }

    pub(crate) const fn page_limit(&self, dataset: Dataset) -> u32 {
        match dataset {
            Dataset::Candles => self.cfg.candle_page_limit,
            Dataset::Trades => self.cfg.trade_page_limit,
        }
    }
}
