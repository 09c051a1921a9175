use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{Candle, Fetched, HarvestError, Symbol, Trade};

/// Remote market-data API that serves bounded pages.
///
/// Implementations issue exactly one request per call and classify the
/// transport result into the [`HarvestError`] taxonomy. They do not wait on
/// the budget governor; the engine admits each call before making it.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Stable name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Fetch up to `limit` one-minute candles opening at or after `start`.
    ///
    /// The returned page is ascending by `period_start`.
    async fn candles(
        &self,
        symbol: &Symbol,
        start: DateTime<Utc>,
        limit: u32,
    ) -> Result<Fetched<Candle>, HarvestError>;

    /// Fetch up to `limit` trades with ids at or after `from_id`.
    ///
    /// The returned page is ascending by `trade_id`.
    async fn trades(
        &self,
        symbol: &Symbol,
        from_id: u64,
        limit: u32,
    ) -> Result<Fetched<Trade>, HarvestError>;
}
