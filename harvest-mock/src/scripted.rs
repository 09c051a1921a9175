use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use harvest_core::{
    BudgetObservation, Candle, Cursor, Dataset, Fetched, HarvestError, Page, PageSource, Symbol,
    Trade,
};

/// Instruction for how one call should behave.
#[derive(Clone)]
pub enum MockBehavior<T> {
    /// Return the provided value immediately.
    Return(T),
    /// Fail immediately with the provided error.
    Fail(HarvestError),
    /// Hang indefinitely (simulate a stalled connection).
    Hang,
}

/// One request observed by a mock source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLog {
    /// Requested symbol.
    pub symbol: Symbol,
    /// Cursor the request was made with.
    pub cursor: Cursor,
    /// Page size requested.
    pub limit: u32,
}

#[derive(Default)]
struct InternalState {
    candle_script: HashMap<Symbol, VecDeque<MockBehavior<Fetched<Candle>>>>,
    trade_script: HashMap<Symbol, VecDeque<MockBehavior<Fetched<Trade>>>>,
    requests: Vec<RequestLog>,
    idle_server_time: Option<DateTime<Utc>>,
}

/// Controller handle used by tests to script a [`ScriptedSource`].
pub struct ScriptController {
    state: Arc<Mutex<InternalState>>,
}

impl ScriptController {
    /// Queue the response to the next unanswered candle request for `symbol`.
    pub async fn push_candles(&self, symbol: &Symbol, behavior: MockBehavior<Fetched<Candle>>) {
        let mut guard = self.state.lock().await;
        guard
            .candle_script
            .entry(symbol.clone())
            .or_default()
            .push_back(behavior);
    }

    /// Queue the response to the next unanswered trade request for `symbol`.
    pub async fn push_trades(&self, symbol: &Symbol, behavior: MockBehavior<Fetched<Trade>>) {
        let mut guard = self.state.lock().await;
        guard
            .trade_script
            .entry(symbol.clone())
            .or_default()
            .push_back(behavior);
    }

    /// Server time reported with the empty pages served once a script runs dry.
    pub async fn set_idle_server_time(&self, at: DateTime<Utc>) {
        self.state.lock().await.idle_server_time = Some(at);
    }

    /// Requests received so far, oldest first.
    pub async fn requests(&self) -> Vec<RequestLog> {
        self.state.lock().await.requests.clone()
    }

    /// Requests received so far for one dataset.
    pub async fn requests_for(&self, dataset: Dataset) -> Vec<RequestLog> {
        let guard = self.state.lock().await;
        guard
            .requests
            .iter()
            .filter(|r| r.cursor.dataset() == dataset)
            .cloned()
            .collect()
    }

    /// Number of queued behaviors not yet consumed.
    pub async fn pending(&self) -> usize {
        let guard = self.state.lock().await;
        guard.candle_script.values().map(VecDeque::len).sum::<usize>()
            + guard.trade_script.values().map(VecDeque::len).sum::<usize>()
    }
}

/// A page source that answers each call with the next queued behavior.
///
/// Once a symbol's queue is empty the source serves empty pages, which ends
/// any ingestion run.
pub struct ScriptedSource {
    name: &'static str,
    state: Arc<Mutex<InternalState>>,
}

impl ScriptedSource {
    /// Create a new scripted source and its controller.
    #[must_use]
    pub fn new_with_controller(name: &'static str) -> (Arc<dyn PageSource>, ScriptController) {
        let state = Arc::new(Mutex::new(InternalState::default()));
        let controller = ScriptController {
            state: Arc::clone(&state),
        };
        let me = Arc::new(Self { name, state });
        (me as Arc<dyn PageSource>, controller)
    }
}

/// A fetched page built from records and the server state they were served at.
#[must_use]
pub fn fetched<R>(records: Vec<R>, server_time: DateTime<Utc>, used_weight: u32) -> Fetched<R> {
    Fetched {
        page: Page::new(records),
        observed: BudgetObservation {
            server_time,
            used_weight,
        },
    }
}

async fn play<R>(behavior: Option<MockBehavior<Fetched<R>>>, idle: DateTime<Utc>) -> Result<Fetched<R>, HarvestError> {
    match behavior {
        Some(MockBehavior::Return(page)) => Ok(page),
        Some(MockBehavior::Fail(e)) => Err(e),
        Some(MockBehavior::Hang) => {
            std::future::pending::<()>().await;
            unreachable!()
        }
        None => Ok(fetched(Vec::new(), idle, 0)),
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn candles(
        &self,
        symbol: &Symbol,
        start: DateTime<Utc>,
        limit: u32,
    ) -> Result<Fetched<Candle>, HarvestError> {
        let (behavior, idle) = {
            let mut guard = self.state.lock().await;
            guard.requests.push(RequestLog {
                symbol: symbol.clone(),
                cursor: Cursor::time(start),
                limit,
            });
            let next = guard
                .candle_script
                .get_mut(symbol)
                .and_then(VecDeque::pop_front);
            (next, guard.idle_server_time.unwrap_or(start))
        };
        play(behavior, idle).await
    }

    async fn trades(
        &self,
        symbol: &Symbol,
        from_id: u64,
        limit: u32,
    ) -> Result<Fetched<Trade>, HarvestError> {
        let (behavior, idle) = {
            let mut guard = self.state.lock().await;
            guard.requests.push(RequestLog {
                symbol: symbol.clone(),
                cursor: Cursor::id(from_id),
                limit,
            });
            let next = guard
                .trade_script
                .get_mut(symbol)
                .and_then(VecDeque::pop_front);
            (next, guard.idle_server_time.unwrap_or(DateTime::UNIX_EPOCH))
        };
        play(behavior, idle).await
    }
}
