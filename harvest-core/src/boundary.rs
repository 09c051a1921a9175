//! Decide which trailing records of a page are final.
//!
//! Candles for the server's current minute can still change after the page
//! was served, so the trailing candle is held back until its minute has
//! closed. Trades are immutable once they have an id, so a trade page is
//! always final in full.

use chrono::{DateTime, Utc};

use crate::{Candle, Trade, floor_minute};

/// A page split into the part that may be persisted and the part that may not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified<'a, R> {
    /// Leading records that will not change anymore.
    pub finalized: &'a [R],
    /// Trailing record that may still change, if any.
    pub withheld: Option<&'a R>,
}

impl<'a, R> Classified<'a, R> {
    /// Every record is final.
    #[must_use]
    pub const fn all(records: &'a [R]) -> Self {
        Self {
            finalized: records,
            withheld: None,
        }
    }

    /// Number of withheld records (0 or 1).
    #[must_use]
    pub const fn withheld_len(&self) -> u64 {
        if self.withheld.is_some() { 1 } else { 0 }
    }
}

/// Classify a candle page against the server clock of its response.
///
/// If the trailing candle opened strictly before the server's current minute,
/// the whole page is final. Otherwise the trailing candle is withheld. A page
/// holding only the open minute yields an empty `finalized` slice.
#[must_use]
pub fn classify_candles(page: &[Candle], server_time: DateTime<Utc>) -> Classified<'_, Candle> {
    let Some((last, head)) = page.split_last() else {
        return Classified::all(page);
    };
    let open_minute = floor_minute(server_time);
    if floor_minute(last.period_start) < open_minute {
        Classified::all(page)
    } else {
        #[cfg(feature = "tracing")]
        tracing::trace!(
            period_start = %last.period_start,
            server_time = %server_time,
            "withholding unclosed candle"
        );
        Classified {
            finalized: head,
            withheld: Some(last),
        }
    }
}

/// Classify a trade page. Trades never change once assigned an id.
#[must_use]
pub const fn classify_trades(page: &[Trade]) -> Classified<'_, Trade> {
    Classified::all(page)
}
