use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use harvest_core::{HarvestError, PageSource, Symbol};

/// Binance futures connector, or a simulated exchange when
/// `HARVEST_EXAMPLES_USE_MOCK` is set.
pub async fn get_source(symbols: &[Symbol]) -> Result<Arc<dyn PageSource>, HarvestError> {
    if std::env::var("HARVEST_EXAMPLES_USE_MOCK").is_ok() {
        println!("--- (Using simulated exchange for CI) ---");
        let now = Utc::now();
        let (source, exchange) = harvest_mock::SimulatedExchange::new_with_controller("sim", now);
        let start = harvest_core::floor_minute(now) - TimeDelta::minutes(90);
        for symbol in symbols {
            exchange
                .upsert_candles(symbol, harvest_mock::fixtures::minute_candles(start, 91))
                .await;
            exchange
                .push_trades(symbol, harvest_mock::fixtures::contiguous_trades(1, start, 500))
                .await;
        }
        return Ok(source);
    }
    let key = std::env::var("BINANCE_API_KEY").unwrap_or_default();
    let cfg = harvest_binance::BinanceConfig::with_api_key(key);
    Ok(Arc::new(harvest_binance::BinanceConnector::new(&cfg)?))
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
