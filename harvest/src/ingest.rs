//! Per-symbol ingestion state machine.
//!
//! ```text
//! Resuming -> Fetching -> Classifying -> (Persisting -> Advancing -> Fetching)* -> Draining
//! ```
//!
//! Fetch, classify, persist, and advance never overlap for one symbol. Any
//! error leaves the machine at once; whatever was committed before it stays
//! committed, and the next run re-derives its cursor from the store.

use std::marker::PhantomData;

use harvest_core::{
    Checkpoint, Cursor, DrainReason, Fetched, HarvestError, IngestReport, Record, Symbol, advance,
    resume_cursor,
};

use crate::core::Harvester;

enum Phase<R> {
    Resuming,
    Fetching,
    Classifying(Fetched<R>),
    Persisting(Vec<R>),
    Advancing(Checkpoint),
    Draining(DrainReason),
}

pub(crate) struct IngestRun<'a, R> {
    harvester: &'a Harvester,
    symbol: &'a Symbol,
    hint: Cursor,
    cursor: Cursor,
    // True once the cursor derives from a stored checkpoint.
    anchored: bool,
    stored: Option<Checkpoint>,
    withheld_refetches: u32,
    pages_fetched: u64,
    batches_committed: u64,
    records_persisted: u64,
    records_withheld: u64,
    _record: PhantomData<R>,
}

impl<'a, R: Record> IngestRun<'a, R> {
    pub(crate) const fn new(harvester: &'a Harvester, symbol: &'a Symbol, hint: Cursor) -> Self {
        Self {
            harvester,
            symbol,
            hint,
            cursor: hint,
            anchored: false,
            stored: None,
            withheld_refetches: 0,
            pages_fetched: 0,
            batches_committed: 0,
            records_persisted: 0,
            records_withheld: 0,
            _record: PhantomData,
        }
    }

    pub(crate) async fn run(mut self) -> Result<IngestReport, HarvestError> {
        if self.hint.dataset() != R::DATASET {
            return Err(HarvestError::InvalidArg(format!(
                "{} cannot start from {}",
                R::DATASET,
                self.hint
            )));
        }
        let mut phase = Phase::Resuming;
        let started_at = loop {
            phase = match phase {
                Phase::Resuming => self.resume().await?,
                Phase::Fetching => self.fetch().await?,
                Phase::Classifying(fetched) => self.classify(fetched),
                Phase::Persisting(batch) => self.persist(batch).await?,
                Phase::Advancing(checkpoint) => self.advance(checkpoint)?,
                Phase::Draining(reason) => break reason,
            };
        };
        Ok(self.report(started_at))
    }

    async fn resume(&mut self) -> Result<Phase<R>, HarvestError> {
        let stored = self
            .harvester
            .store()
            .last_checkpoint(self.symbol, R::DATASET)
            .await?;
        self.cursor = resume_cursor(stored.as_ref(), self.hint)?;
        self.anchored = stored.is_some();
        self.stored = stored;
        self.hint = self.cursor;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            symbol = %self.symbol,
            cursor = %self.cursor,
            resumed = self.anchored,
            "resuming"
        );
        Ok(Phase::Fetching)
    }

    async fn fetch(&mut self) -> Result<Phase<R>, HarvestError> {
        if let Some(cap) = self.harvester.cfg.max_pages_per_run
            && self.pages_fetched >= cap
        {
            return Ok(Phase::Draining(DrainReason::PageCap));
        }
        let limit = self.harvester.page_limit(R::DATASET);
        let fetched =
            R::fetch(self.harvester.source.as_ref(), self.symbol, self.cursor, limit).await?;
        self.pages_fetched += 1;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            symbol = %self.symbol,
            cursor = %self.cursor,
            records = fetched.page.len(),
            "page fetched"
        );
        if fetched.page.is_empty() {
            return Ok(Phase::Draining(DrainReason::EmptyPage));
        }
        Ok(Phase::Classifying(fetched))
    }

    fn classify(&mut self, fetched: Fetched<R>) -> Phase<R> {
        let mut records = fetched.page.records;
        let classified = R::classify(&records, fetched.observed.server_time);
        let finalized = classified.finalized.len();
        self.records_withheld += classified.withheld_len();
        if finalized == 0 {
            // Only an unclosed candle came back: ask again from the same cursor
            // a bounded number of times, then leave it for a later run.
            if self.withheld_refetches < self.harvester.cfg.max_withheld_refetches {
                self.withheld_refetches += 1;
                return Phase::Fetching;
            }
            return Phase::Draining(DrainReason::AwaitingClose);
        }
        records.truncate(finalized);
        Phase::Persisting(records)
    }

    async fn persist(&mut self, batch: Vec<R>) -> Result<Phase<R>, HarvestError> {
        let checkpoint = self
            .harvester
            .writer
            .persist(
                self.symbol,
                &batch,
                &self.cursor,
                self.anchored,
                self.stored.as_ref(),
            )
            .await?;
        self.batches_committed += 1;
        self.records_persisted += batch.len() as u64;
        Ok(Phase::Advancing(checkpoint))
    }

    fn advance(&mut self, checkpoint: Checkpoint) -> Result<Phase<R>, HarvestError> {
        self.cursor = advance(&checkpoint)?;
        self.stored = Some(checkpoint);
        self.anchored = true;
        self.withheld_refetches = 0;
        Ok(Phase::Fetching)
    }

    fn report(&self, drained: DrainReason) -> IngestReport {
        #[cfg(feature = "tracing")]
        tracing::info!(
            symbol = %self.symbol,
            dataset = %R::DATASET,
            next_cursor = %self.cursor,
            pages = self.pages_fetched,
            records = self.records_persisted,
            ?drained,
            "ingestion drained"
        );
        IngestReport {
            symbol: self.symbol.clone(),
            dataset: R::DATASET,
            started_at: self.hint,
            next_cursor: self.cursor,
            checkpoint: self.stored,
            pages_fetched: self.pages_fetched,
            batches_committed: self.batches_committed,
            records_persisted: self.records_persisted,
            records_withheld: self.records_withheld,
            drained,
        }
    }
}
