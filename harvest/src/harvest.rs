use std::collections::HashSet;

use futures::StreamExt;
use harvest_core::{Cursor, HarvestError, HarvestReport, Symbol, SymbolFailure};

use crate::core::Harvester;

/// Builder to ingest many symbols of one dataset concurrently.
///
/// All symbols share the engine's governor, so running more of them at once
/// only overlaps their store writes and local work; the remote budget is
/// spent no faster.
pub struct HarvestBuilder<'a> {
    pub(crate) harvester: &'a Harvester,
    pub(crate) symbols: Vec<Symbol>,
    pub(crate) start: Option<Cursor>,
}

impl<'a> HarvestBuilder<'a> {
    /// Create a new builder bound to a `Harvester`, with no symbols and no
    /// starting cursor.
    #[must_use]
    pub const fn new(harvester: &'a Harvester) -> Self {
        Self {
            harvester,
            symbols: Vec::new(),
            start: None,
        }
    }

    /// Replace the symbol list.
    ///
    /// # Errors
    /// Returns an error if `symbols` names the same symbol twice.
    pub fn symbols(mut self, symbols: &[Symbol]) -> Result<Self, HarvestError> {
        let mut seen = HashSet::new();
        for symbol in symbols {
            if !seen.insert(symbol) {
                return Err(HarvestError::InvalidArg(format!(
                    "duplicate symbol '{symbol}' in symbols list"
                )));
            }
        }
        self.symbols = symbols.to_vec();
        Ok(self)
    }

    /// Add a single symbol to the list.
    ///
    /// # Errors
    /// Returns an error if the symbol is already in the list.
    pub fn add_symbol(mut self, symbol: Symbol) -> Result<Self, HarvestError> {
        if self.symbols.contains(&symbol) {
            return Err(HarvestError::InvalidArg(format!(
                "duplicate symbol '{symbol}' already exists in symbols list"
            )));
        }
        self.symbols.push(symbol);
        Ok(self)
    }

    /// Starting cursor for symbols without a checkpoint. Its variant selects
    /// the dataset for every symbol.
    #[must_use]
    pub const fn start(mut self, start: Cursor) -> Self {
        self.start = Some(start);
        self
    }

    /// Run every symbol to drain, at most `max_concurrent_symbols` at a time.
    ///
    /// A symbol that fails is recorded in [`HarvestReport::failures`] with its
    /// error; its checkpoint stays at its last commit and the other symbols
    /// carry on. Reports and failures keep the order symbols were given in.
    ///
    /// # Errors
    /// Returns an error only if no symbols or no starting cursor were given.
    pub async fn run(self) -> Result<HarvestReport, HarvestError> {
        if self.symbols.is_empty() {
            return Err(HarvestError::InvalidArg(
                "no symbols specified for harvest".into(),
            ));
        }
        let start = self
            .start
            .ok_or_else(|| HarvestError::InvalidArg("no start cursor specified for harvest".into()))?;

        let harvester = self.harvester;
        let limit = harvester.cfg.max_concurrent_symbols.max(1);
        let results: Vec<_> = futures::stream::iter(self.symbols.into_iter().map(|symbol| {
            async move {
                let result = harvester.ingest(&symbol, start).await;
                (symbol, result)
            }
        }))
        .buffered(limit)
        .collect()
        .await;

        let mut report = HarvestReport::default();
        for (symbol, result) in results {
            match result {
                Ok(r) => report.reports.push(r),
                Err(error) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(symbol = %symbol, error = %error, "symbol harvest failed");
                    report.failures.push(SymbolFailure { symbol, error });
                }
            }
        }
        Ok(report)
    }
}
