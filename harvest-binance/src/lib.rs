//! harvest-binance
//!
//! Public connector that implements `PageSource` against the Binance futures
//! REST API: one-minute klines paged by `startTime` and historical trades
//! paged by `fromId`. Every response is checked for status, content type, and
//! the budget headers before its body is decoded.
#![warn(missing_docs)]

/// HTTP adapter trait and the production adapter backed by `reqwest`.
pub mod adapter;
mod config;
/// Status, content type, and budget header handling.
pub mod meta;
/// Typed page decoding.
pub mod wire;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use harvest_core::{Candle, Fetched, HarvestError, Page, PageSource, Symbol, Trade};

use adapter::{BinanceHttp, HttpResponse, RealAdapter};
pub use config::BinanceConfig;

/// Public connector type. Production users construct it with [`BinanceConnector::new`].
pub struct BinanceConnector {
    http: Arc<dyn BinanceHttp>,
}

impl BinanceConnector {
    /// Static name used in logs and errors.
    pub const NAME: &'static str = "harvest-binance";

    /// Build with a fresh `reqwest::Client`.
    ///
    /// # Errors
    /// Returns `InvalidArg` when the HTTP client cannot be constructed.
    pub fn new(config: &BinanceConfig) -> Result<Self, HarvestError> {
        Ok(Self::from_adapter(Arc::new(RealAdapter::new(config)?)))
    }

    /// Build from an existing `reqwest::Client`.
    #[must_use]
    pub fn with_client(http: reqwest::Client, config: &BinanceConfig) -> Self {
        Self::from_adapter(Arc::new(RealAdapter::with_client(http, config)))
    }

    /// Build from any adapter, e.g. a canned one in tests.
    #[must_use]
    pub fn from_adapter(http: Arc<dyn BinanceHttp>) -> Self {
        Self { http }
    }

    async fn fetch<R>(
        &self,
        path: &str,
        query: &[(&str, String)],
        decode: fn(&[u8]) -> Result<Vec<R>, HarvestError>,
    ) -> Result<Fetched<R>, HarvestError> {
        let HttpResponse {
            status,
            headers,
            body,
        } = self.http.get(path, query).await?;
        meta::check_status(status, &headers)?;
        meta::check_content_type(&headers)?;
        let observed = meta::budget_observation(&headers)?;
        let records = decode(&body)?;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            path,
            records = records.len(),
            used_weight = observed.used_weight,
            server_time = %observed.server_time,
            "page received"
        );
        Ok(Fetched {
            page: Page::new(records),
            observed,
        })
    }
}

#[async_trait]
impl PageSource for BinanceConnector {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn candles(
        &self,
        symbol: &Symbol,
        start: DateTime<Utc>,
        limit: u32,
    ) -> Result<Fetched<Candle>, HarvestError> {
        let query = [
            ("symbol", symbol.as_str().to_string()),
            ("interval", "1m".to_string()),
            ("limit", limit.to_string()),
            ("startTime", start.timestamp_millis().to_string()),
        ];
        self.fetch("klines", &query, wire::decode_klines).await
    }

    async fn trades(
        &self,
        symbol: &Symbol,
        from_id: u64,
        limit: u32,
    ) -> Result<Fetched<Trade>, HarvestError> {
        let query = [
            ("symbol", symbol.as_str().to_string()),
            ("limit", limit.to_string()),
            ("fromId", from_id.to_string()),
        ];
        self.fetch("historicalTrades", &query, wire::decode_trades)
            .await
    }
}
