//! Page source wrapper that admits every request through the shared budget
//! governor.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use harvest_core::{Candle, Fetched, HarvestError, PageSource, RetryConfig, Symbol, Trade};

use crate::governor::BudgetGovernor;
use crate::retry::retry_transient;

/// Wraps a [`PageSource`] so that each request:
///
/// - waits for admission from the shared [`BudgetGovernor`] and holds its
///   gate until the response's budget is recorded
/// - feeds the response's budget observation back into the governor
/// - trips the governor on a rate-limit or ban status
/// - is repeated with backoff on transient transport failures
pub struct GovernedSource {
    inner: Arc<dyn PageSource>,
    governor: Arc<BudgetGovernor>,
    retry: RetryConfig,
}

impl GovernedSource {
    /// Wrap `inner` behind `governor`.
    pub fn new(inner: Arc<dyn PageSource>, governor: Arc<BudgetGovernor>, retry: RetryConfig) -> Self {
        Self {
            inner,
            governor,
            retry,
        }
    }

    /// Access the inner source.
    pub fn inner(&self) -> &Arc<dyn PageSource> {
        &self.inner
    }

    /// Shared governor this wrapper admits through.
    pub fn governor(&self) -> &Arc<BudgetGovernor> {
        &self.governor
    }

    async fn governed<R, F, Fut>(&self, call: F) -> Result<Fetched<R>, HarvestError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Fetched<R>, HarvestError>>,
    {
        let governor = &*self.governor;
        let call = &call;
        retry_transient(&self.retry, move |_attempt| async move {
            let permit = governor.acquire().await?;
            match call().await {
                Ok(fetched) => {
                    permit.update(fetched.observed);
                    Ok(fetched)
                }
                Err(HarvestError::RateLimited {
                    status,
                    retry_after_ms,
                }) => {
                    permit.trip(retry_after_ms.map(Duration::from_millis));
                    Err(HarvestError::RateLimited {
                        status,
                        retry_after_ms,
                    })
                }
                Err(e) => Err(e),
            }
        })
        .await
    }
}

#[async_trait]
impl PageSource for GovernedSource {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "harvest::governed::candles",
            skip(self, symbol),
            fields(source = self.inner.name(), symbol = %symbol),
        )
    )]
    async fn candles(
        &self,
        symbol: &Symbol,
        start: DateTime<Utc>,
        limit: u32,
    ) -> Result<Fetched<Candle>, HarvestError> {
        self.governed(|| self.inner.candles(symbol, start, limit)).await
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "harvest::governed::trades",
            skip(self, symbol),
            fields(source = self.inner.name(), symbol = %symbol),
        )
    )]
    async fn trades(
        &self,
        symbol: &Symbol,
        from_id: u64,
        limit: u32,
    ) -> Result<Fetched<Trade>, HarvestError> {
        self.governed(|| self.inner.trades(symbol, from_id, limit)).await
    }
}
