//! Ordering and contiguity checks on a finalized batch before it is persisted.

use crate::{Candle, Cursor, HarvestError, Trade, floor_minute};

/// Check that candles are minute-aligned, strictly increasing, and start at or
/// after `cursor`.
///
/// # Errors
/// `MalformedPage` for an unaligned open time, `OutOfOrder` for a record that
/// repeats or precedes an earlier one, and `InvalidArg` for a trade cursor.
pub fn validate_candles(batch: &[Candle], cursor: &Cursor) -> Result<(), HarvestError> {
    let Cursor::Time { next_period_start } = *cursor else {
        return Err(HarvestError::InvalidArg(format!(
            "candle batch validated against {cursor}"
        )));
    };
    let mut floor = next_period_start;
    let mut previous = None;
    for candle in batch {
        if floor_minute(candle.period_start) != candle.period_start {
            return Err(HarvestError::malformed(format!(
                "candle open time {} is not minute aligned",
                candle.period_start
            )));
        }
        if candle.period_start < floor {
            let what = previous.map_or_else(
                || format!("candle {} precedes cursor {cursor}", candle.period_start),
                |p| format!("candle {} follows {p}", candle.period_start),
            );
            return Err(HarvestError::OutOfOrder(what));
        }
        previous = Some(candle.period_start);
        floor = candle.period_start + chrono::TimeDelta::minutes(1);
    }
    Ok(())
}

/// Check that trade ids are contiguous and start where the cursor points.
///
/// When `anchored` is true the cursor was derived from a stored checkpoint and
/// the first id must equal it exactly. A caller-supplied start hint only
/// requires the first id to be at or after it.
///
/// # Errors
/// `OutOfOrder` for ids before the cursor or not increasing, `Gap` for a
/// skipped id, and `InvalidArg` for a time cursor.
pub fn validate_trades(batch: &[Trade], cursor: &Cursor, anchored: bool) -> Result<(), HarvestError> {
    let Cursor::Id { next_trade_id } = *cursor else {
        return Err(HarvestError::InvalidArg(format!(
            "trade batch validated against {cursor}"
        )));
    };
    let Some(first) = batch.first() else {
        return Ok(());
    };
    if first.trade_id < next_trade_id {
        return Err(HarvestError::OutOfOrder(format!(
            "trade {} precedes cursor {cursor}",
            first.trade_id
        )));
    }
    if anchored && first.trade_id != next_trade_id {
        return Err(HarvestError::Gap {
            expected: next_trade_id,
            found: first.trade_id,
        });
    }
    for pair in batch.windows(2) {
        let (prev, next) = (pair[0].trade_id, pair[1].trade_id);
        if next <= prev {
            return Err(HarvestError::OutOfOrder(format!("trade {next} follows {prev}")));
        }
        if next != prev + 1 {
            return Err(HarvestError::Gap {
                expected: prev + 1,
                found: next,
            });
        }
    }
    Ok(())
}
