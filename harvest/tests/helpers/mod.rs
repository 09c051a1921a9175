// Shared fixtures so tests can `use crate::helpers::*;`
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use harvest::{Harvester, HarvesterBuilder, PageSource, RetryConfig, Symbol};
use harvest_mock::MemoryStore;

#[allow(unused_imports)]
pub use harvest_mock::{MockBehavior, ScriptedSource, SimulatedExchange, fetched, fixtures};

pub const BTC: &str = "BTCUSDT";
pub const ETH: &str = "ETHUSDT";
pub const SOL: &str = "SOLUSDT";

pub fn sym(s: &str) -> Symbol {
    Symbol::new(s).unwrap()
}

/// A UTC timestamp on 2024-06-01.
pub fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, h, m, s).unwrap()
}

/// Builder over `source` and `store` with retries off, so failures surface at once.
pub fn builder(source: Arc<dyn PageSource>, store: Arc<MemoryStore>) -> HarvesterBuilder {
    Harvester::builder()
        .with_source(source)
        .with_store(store)
        .retry(RetryConfig::disabled())
}

pub fn harvester(source: Arc<dyn PageSource>, store: Arc<MemoryStore>) -> Harvester {
    builder(source, store).build().unwrap()
}
