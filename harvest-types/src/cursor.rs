//! Resume positions into a remote sequence and the durable marker they derive from.

use core::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::market::Dataset;

/// Position of the next record to request.
///
/// A cursor has no identity of its own: it is always derivable from the last
/// stored record, or from a caller-supplied starting point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Cursor {
    /// Next candle open time to request (`startTime`).
    Time {
        /// Minute the next page starts at.
        next_period_start: DateTime<Utc>,
    },
    /// Next trade id to request (`fromId`).
    Id {
        /// Id the next page starts at.
        next_trade_id: u64,
    },
}

impl Cursor {
    /// Time cursor starting at `start` truncated to its minute.
    #[must_use]
    pub fn time(start: DateTime<Utc>) -> Self {
        Self::Time {
            next_period_start: floor_minute(start),
        }
    }

    /// Id cursor starting at `next_trade_id`.
    #[must_use]
    pub const fn id(next_trade_id: u64) -> Self {
        Self::Id { next_trade_id }
    }

    /// Dataset this cursor walks through.
    #[must_use]
    pub const fn dataset(&self) -> Dataset {
        match self {
            Self::Time { .. } => Dataset::Candles,
            Self::Id { .. } => Dataset::Trades,
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Time { next_period_start } => {
                write!(f, "startTime={}", next_period_start.to_rfc3339())
            }
            Self::Id { next_trade_id } => write!(f, "fromId={next_trade_id}"),
        }
    }
}

/// Durable marker of the last record a store committed for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Checkpoint {
    /// Open time of the last stored candle.
    Candle {
        /// Minute of the last stored candle.
        period_start: DateTime<Utc>,
    },
    /// Id of the last stored trade.
    Trade {
        /// Id of the last stored trade.
        trade_id: u64,
    },
}

impl Checkpoint {
    /// Dataset this checkpoint belongs to.
    #[must_use]
    pub const fn dataset(&self) -> Dataset {
        match self {
            Self::Candle { .. } => Dataset::Candles,
            Self::Trade { .. } => Dataset::Trades,
        }
    }

    /// True when `self` lies strictly after `other` in the same dataset.
    ///
    /// Checkpoints of different datasets are never ordered.
    #[must_use]
    pub fn is_after(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Candle { period_start: a }, Self::Candle { period_start: b }) => a > b,
            (Self::Trade { trade_id: a }, Self::Trade { trade_id: b }) => a > b,
            _ => false,
        }
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Candle { period_start } => write!(f, "candle@{}", period_start.to_rfc3339()),
            Self::Trade { trade_id } => write!(f, "trade#{trade_id}"),
        }
    }
}

/// Truncate a timestamp to the start of its minute.
#[must_use]
pub fn floor_minute(ts: DateTime<Utc>) -> DateTime<Utc> {
    floor_to(ts, TimeDelta::minutes(1))
}

/// Truncate a timestamp down to a multiple of `step` since the Unix epoch.
///
/// Non-positive steps return the input unchanged.
#[must_use]
pub fn floor_to(ts: DateTime<Utc>, step: TimeDelta) -> DateTime<Utc> {
    let step_ms = step.num_milliseconds();
    if step_ms <= 0 {
        return ts;
    }
    let ms = ts.timestamp_millis();
    let floored = ms - ms.rem_euclid(step_ms);
    DateTime::from_timestamp_millis(floored).unwrap_or(ts)
}
