//! Configuration types shared across the engine, middleware, and connectors.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Limits for the shared budget governor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernorConfig {
    /// Maximum weight the server allows within one window.
    pub max_weight: u32,
    /// Delay inserted before a request when some weight is already used.
    pub pacing: Duration,
    /// Length of the server's accounting window.
    pub window: Duration,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            max_weight: 1200,
            pacing: Duration::from_millis(500),
            window: Duration::from_secs(60),
        }
    }
}

/// Exponential backoff for retrying transient transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one (>= 1).
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds.
    pub min_backoff_ms: u64,
    /// Upper bound for any single delay in milliseconds.
    pub max_backoff_ms: u64,
    /// Exponential factor applied after each failed attempt (>= 1).
    pub factor: u32,
    /// Random jitter percentage [0, 100] added to each delay.
    pub jitter_percent: u8,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_backoff_ms: 500,
            max_backoff_ms: 30_000,
            factor: 2,
            jitter_percent: 20,
        }
    }
}

impl RetryConfig {
    /// Configuration that never retries.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            max_attempts: 1,
            min_backoff_ms: 0,
            max_backoff_ms: 0,
            factor: 1,
            jitter_percent: 0,
        }
    }
}

/// Global configuration for the `Harvester` engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Budget governor limits.
    pub governor: GovernorConfig,
    /// Transient failure retry policy.
    pub retry: RetryConfig,
    /// `limit` sent with candle page requests.
    pub candle_page_limit: u32,
    /// `limit` sent with trade page requests.
    pub trade_page_limit: u32,
    /// How often a page holding only an unclosed candle is re-requested with
    /// the same cursor before the run drains.
    pub max_withheld_refetches: u32,
    /// Optional cap on pages fetched by a single `ingest` call.
    pub max_pages_per_run: Option<u64>,
    /// Upper bound on symbols ingested concurrently by a multi-symbol harvest.
    pub max_concurrent_symbols: usize,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            governor: GovernorConfig::default(),
            retry: RetryConfig::default(),
            candle_page_limit: 1500,
            trade_page_limit: 1000,
            max_withheld_refetches: 1,
            max_pages_per_run: None,
            max_concurrent_symbols: 4,
        }
    }
}
