use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;

use harvest_core::{
    BudgetObservation, Candle, Cursor, Fetched, HarvestError, Page, PageSource, Symbol, Trade,
    floor_minute,
};

use crate::scripted::RequestLog;

struct ExchangeState {
    candles: HashMap<Symbol, Vec<Candle>>,
    trades: HashMap<Symbol, Vec<Trade>>,
    server_time: DateTime<Utc>,
    window_start: DateTime<Utc>,
    used_weight: u32,
    weight_per_request: u32,
    failures: VecDeque<HarvestError>,
    requests: Vec<RequestLog>,
}

impl ExchangeState {
    fn charge(&mut self) -> BudgetObservation {
        let window = floor_minute(self.server_time);
        if window != self.window_start {
            self.window_start = window;
            self.used_weight = 0;
        }
        self.used_weight = self.used_weight.saturating_add(self.weight_per_request);
        BudgetObservation {
            server_time: self.server_time,
            used_weight: self.used_weight,
        }
    }
}

/// Controller handle used by tests to drive a [`SimulatedExchange`].
pub struct ExchangeController {
    state: Arc<Mutex<ExchangeState>>,
}

impl ExchangeController {
    /// Set the exchange clock.
    pub async fn set_server_time(&self, at: DateTime<Utc>) {
        self.state.lock().await.server_time = at;
    }

    /// Move the exchange clock forward.
    pub async fn advance_clock(&self, by: TimeDelta) {
        let mut guard = self.state.lock().await;
        guard.server_time += by;
    }

    /// Add candles to a symbol's history, keeping it sorted and unique.
    ///
    /// A candle with an already known open time replaces the old one, which
    /// is how a still-open candle gets its final values.
    pub async fn upsert_candles(&self, symbol: &Symbol, candles: Vec<Candle>) {
        let mut guard = self.state.lock().await;
        let history = guard.candles.entry(symbol.clone()).or_default();
        for candle in candles {
            match history.binary_search_by_key(&candle.period_start, |c| c.period_start) {
                Ok(i) => history[i] = candle,
                Err(i) => history.insert(i, candle),
            }
        }
    }

    /// Add trades to a symbol's history, keeping it sorted by id.
    pub async fn push_trades(&self, symbol: &Symbol, trades: Vec<Trade>) {
        let mut guard = self.state.lock().await;
        let history = guard.trades.entry(symbol.clone()).or_default();
        history.extend(trades);
        history.sort_by_key(|t| t.trade_id);
        history.dedup_by_key(|t| t.trade_id);
    }

    /// Weight charged for every request (default 2).
    pub async fn set_weight_per_request(&self, weight: u32) {
        self.state.lock().await.weight_per_request = weight;
    }

    /// Answer the next request with `err` instead of a page.
    pub async fn fail_next(&self, err: HarvestError) {
        self.state.lock().await.failures.push_back(err);
    }

    /// Requests received so far, oldest first.
    pub async fn requests(&self) -> Vec<RequestLog> {
        self.state.lock().await.requests.clone()
    }
}

/// An in-memory exchange that pages through a fixed history.
///
/// Candles are served up to and including the minute open at the exchange
/// clock, so the trailing one may still be open. Trades are served once their
/// execution time has passed. Every response reports the weight used in the
/// current clock minute.
pub struct SimulatedExchange {
    name: &'static str,
    state: Arc<Mutex<ExchangeState>>,
}

impl SimulatedExchange {
    /// Create an exchange whose clock reads `server_time`, and its controller.
    #[must_use]
    pub fn new_with_controller(
        name: &'static str,
        server_time: DateTime<Utc>,
    ) -> (Arc<dyn PageSource>, ExchangeController) {
        let state = Arc::new(Mutex::new(ExchangeState {
            candles: HashMap::new(),
            trades: HashMap::new(),
            server_time,
            window_start: floor_minute(server_time),
            used_weight: 0,
            weight_per_request: 2,
            failures: VecDeque::new(),
            requests: Vec::new(),
        }));
        let controller = ExchangeController {
            state: Arc::clone(&state),
        };
        let me = Arc::new(Self { name, state });
        (me as Arc<dyn PageSource>, controller)
    }
}

fn take_limit(limit: u32) -> usize {
    usize::try_from(limit).unwrap_or(usize::MAX)
}

#[async_trait]
impl PageSource for SimulatedExchange {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn candles(
        &self,
        symbol: &Symbol,
        start: DateTime<Utc>,
        limit: u32,
    ) -> Result<Fetched<Candle>, HarvestError> {
        let mut guard = self.state.lock().await;
        guard.requests.push(RequestLog {
            symbol: symbol.clone(),
            cursor: Cursor::time(start),
            limit,
        });
        if let Some(err) = guard.failures.pop_front() {
            return Err(err);
        }
        let now = guard.server_time;
        let records = guard
            .candles
            .get(symbol)
            .map(|history| {
                history
                    .iter()
                    .filter(|c| c.period_start >= start && c.period_start <= now)
                    .take(take_limit(limit))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let observed = guard.charge();
        Ok(Fetched {
            page: Page::new(records),
            observed,
        })
    }

    async fn trades(
        &self,
        symbol: &Symbol,
        from_id: u64,
        limit: u32,
    ) -> Result<Fetched<Trade>, HarvestError> {
        let mut guard = self.state.lock().await;
        guard.requests.push(RequestLog {
            symbol: symbol.clone(),
            cursor: Cursor::id(from_id),
            limit,
        });
        if let Some(err) = guard.failures.pop_front() {
            return Err(err);
        }
        let now = guard.server_time;
        let records = guard
            .trades
            .get(symbol)
            .map(|history| {
                history
                    .iter()
                    .filter(|t| t.trade_id >= from_id && t.executed_at <= now)
                    .take(take_limit(limit))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let observed = guard.charge();
        Ok(Fetched {
            page: Page::new(records),
            observed,
        })
    }
}
