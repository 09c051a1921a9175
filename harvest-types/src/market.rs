//! Normalized market records and the symbol they belong to.

use core::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::HarvestError;

/// Exchange symbol, e.g. `BTCUSDT`.
///
/// Always stored uppercase; contains only ASCII letters and digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Validate and normalize a symbol.
    ///
    /// # Errors
    /// Returns `InvalidArg` when the input is empty or contains characters
    /// other than ASCII letters and digits.
    pub fn new(raw: &str) -> Result<Self, HarvestError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(HarvestError::InvalidArg("empty symbol".into()));
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(HarvestError::InvalidArg(format!(
                "symbol '{trimmed}' must be ASCII alphanumeric"
            )));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// The uppercase symbol as sent to the remote API.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase form used for per-symbol storage names.
    #[must_use]
    pub fn lowercase(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Symbol {
    type Error = HarvestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Symbol> for String {
    fn from(s: Symbol) -> Self {
        s.0
    }
}

/// Which remote sequence a run walks through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    /// One-minute price candles, paged by open time.
    Candles,
    /// Individual trades, paged by trade id.
    Trades,
}

impl Dataset {
    /// Stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Candles => "candles",
            Self::Trades => "trades",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One calendar minute of aggregated trading for a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Minute-aligned open time.
    pub period_start: DateTime<Utc>,
    /// First trade price of the minute.
    pub open: Decimal,
    /// Highest trade price of the minute.
    pub high: Decimal,
    /// Lowest trade price of the minute.
    pub low: Decimal,
    /// Last trade price of the minute.
    pub close: Decimal,
    /// Number of trades in the minute.
    pub trade_count: u64,
    /// Traded volume in the base asset.
    pub base_volume: Decimal,
    /// Base-asset volume bought by takers.
    pub taker_buy_base_volume: Decimal,
    /// Traded volume in the quote asset.
    pub quote_volume: Decimal,
    /// Quote-asset volume bought by takers.
    pub taker_buy_quote_volume: Decimal,
}

/// A single executed trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Exchange-assigned id; contiguous and increasing per symbol.
    pub trade_id: u64,
    /// Execution time.
    pub executed_at: DateTime<Utc>,
    /// Execution price.
    pub price: Decimal,
    /// Quantity in the base asset.
    pub quantity: Decimal,
    /// Quantity in the quote asset.
    pub quote_quantity: Decimal,
    /// True when the buyer was the resting (maker) side.
    pub is_buyer_maker: bool,
}
