//! Compute the next cursor from the last finalized record.

use chrono::TimeDelta;

use crate::{Checkpoint, Cursor, HarvestError, floor_minute};

/// Cursor immediately after `checkpoint`.
///
/// Candles advance to the minute after the checkpoint's minute; trades to the
/// next id. Only ever call this with the position of a record that was
/// persisted, never a withheld one.
///
/// # Errors
/// Returns `InvalidArg` if the next position overflows.
pub fn advance(checkpoint: &Checkpoint) -> Result<Cursor, HarvestError> {
    match *checkpoint {
        Checkpoint::Candle { period_start } => floor_minute(period_start)
            .checked_add_signed(TimeDelta::minutes(1))
            .map(|next_period_start| Cursor::Time { next_period_start })
            .ok_or_else(|| HarvestError::InvalidArg(format!("cursor overflow after {checkpoint}"))),
        Checkpoint::Trade { trade_id } => trade_id
            .checked_add(1)
            .map(Cursor::id)
            .ok_or_else(|| HarvestError::InvalidArg(format!("cursor overflow after {checkpoint}"))),
    }
}

/// Starting cursor for a run: after the stored checkpoint, else the caller's hint.
///
/// # Errors
/// Returns `InvalidArg` if the hint and the stored checkpoint belong to
/// different datasets, or if advancing overflows.
pub fn resume_cursor(stored: Option<&Checkpoint>, hint: Cursor) -> Result<Cursor, HarvestError> {
    match stored {
        None => Ok(normalize(hint)),
        Some(cp) if cp.dataset() != hint.dataset() => Err(HarvestError::InvalidArg(format!(
            "start hint {hint} does not match stored {cp}"
        ))),
        Some(cp) => advance(cp),
    }
}

fn normalize(cursor: Cursor) -> Cursor {
    match cursor {
        Cursor::Time { next_period_start } => Cursor::time(next_period_start),
        id @ Cursor::Id { .. } => id,
    }
}
