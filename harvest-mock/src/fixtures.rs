//! Deterministic record builders.

use chrono::{DateTime, TimeDelta, Utc};
use harvest_core::{Candle, Trade};
use rust_decimal::Decimal;

/// A one-minute candle whose prices are derived from its open time.
#[must_use]
pub fn candle(period_start: DateTime<Utc>) -> Candle {
    let minute = Decimal::from(period_start.timestamp().div_euclid(60).rem_euclid(1_000));
    let open = Decimal::from(100) + minute;
    Candle {
        period_start,
        open,
        high: open + Decimal::TWO,
        low: open - Decimal::ONE,
        close: open + Decimal::ONE,
        trade_count: 10,
        base_volume: Decimal::from(5),
        taker_buy_base_volume: Decimal::TWO,
        quote_volume: open * Decimal::from(5),
        taker_buy_quote_volume: open * Decimal::TWO,
    }
}

/// `count` consecutive minute candles opening at `start`.
#[must_use]
pub fn minute_candles(start: DateTime<Utc>, count: usize) -> Vec<Candle> {
    (0..count)
        .map(|i| candle(start + TimeDelta::minutes(i64::try_from(i).unwrap_or(i64::MAX))))
        .collect()
}

/// A trade whose fields are derived from its id.
#[must_use]
pub fn trade(trade_id: u64, executed_at: DateTime<Utc>) -> Trade {
    let price = Decimal::from(20_000) + Decimal::from(trade_id % 100);
    let quantity = Decimal::new(i64::try_from(trade_id % 7 + 1).unwrap_or(1), 3);
    Trade {
        trade_id,
        executed_at,
        price,
        quantity,
        quote_quantity: price * quantity,
        is_buyer_maker: trade_id % 2 == 0,
    }
}

/// `count` contiguous trades starting at `first_id`, one second apart.
#[must_use]
pub fn contiguous_trades(first_id: u64, start: DateTime<Utc>, count: usize) -> Vec<Trade> {
    (0..count as u64)
        .map(|i| {
            let at = start + TimeDelta::seconds(i64::try_from(i).unwrap_or(i64::MAX));
            trade(first_id + i, at)
        })
        .collect()
}
