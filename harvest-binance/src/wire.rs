//! Typed decode of kline and trade pages.

use chrono::{DateTime, Utc};
use harvest_core::{Candle, HarvestError, Trade};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::IgnoredAny;

/// One kline row exactly as the API sends it.
///
/// `[open time, open, high, low, close, volume, close time, quote volume,
/// trade count, taker buy base volume, taker buy quote volume, ignore]`
// Close time and the trailing field only hold their positions.
#[allow(dead_code)]
#[derive(Debug, Deserialize)]
struct KlineRow(
    i64,
    Decimal,
    Decimal,
    Decimal,
    Decimal,
    Decimal,
    IgnoredAny,
    Decimal,
    u64,
    Decimal,
    Decimal,
    IgnoredAny,
);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TradeRow {
    id: u64,
    price: Decimal,
    qty: Decimal,
    quote_qty: Decimal,
    time: i64,
    is_buyer_maker: bool,
}

fn millis(ms: i64, what: &str) -> Result<DateTime<Utc>, HarvestError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| HarvestError::malformed(format!("{what} {ms} out of range")))
}

/// Decode a `/klines` body into candles ascending by open time.
///
/// # Errors
/// `MalformedPage` when the body is not an array of 12-element rows with the
/// expected field types.
pub fn decode_klines(body: &[u8]) -> Result<Vec<Candle>, HarvestError> {
    let rows: Vec<KlineRow> = serde_json::from_slice(body)
        .map_err(|e| HarvestError::malformed(format!("klines: {e}")))?;
    let mut candles = rows
        .into_iter()
        .map(|r| {
            Ok(Candle {
                period_start: millis(r.0, "kline open time")?,
                open: r.1,
                high: r.2,
                low: r.3,
                close: r.4,
                base_volume: r.5,
                quote_volume: r.7,
                trade_count: r.8,
                taker_buy_base_volume: r.9,
                taker_buy_quote_volume: r.10,
            })
        })
        .collect::<Result<Vec<_>, HarvestError>>()?;
    candles.sort_by_key(|c| c.period_start);
    Ok(candles)
}

/// Decode a `/historicalTrades` body into trades ascending by id.
///
/// # Errors
/// `MalformedPage` when the body is not an array of trade objects.
pub fn decode_trades(body: &[u8]) -> Result<Vec<Trade>, HarvestError> {
    let rows: Vec<TradeRow> = serde_json::from_slice(body)
        .map_err(|e| HarvestError::malformed(format!("trades: {e}")))?;
    let mut trades = rows
        .into_iter()
        .map(|r| {
            Ok(Trade {
                trade_id: r.id,
                executed_at: millis(r.time, "trade time")?,
                price: r.price,
                quantity: r.qty,
                quote_quantity: r.quote_qty,
                is_buyer_maker: r.is_buyer_maker,
            })
        })
        .collect::<Result<Vec<_>, HarvestError>>()?;
    trades.sort_by_key(|t| t.trade_id);
    Ok(trades)
}
