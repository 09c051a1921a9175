use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection settings for the Binance REST API.
#[derive(Clone, Serialize, Deserialize)]
pub struct BinanceConfig {
    /// Base URL the endpoint paths are appended to.
    pub base_url: String,
    /// Value sent in the `X-MBX-APIKEY` header.
    pub api_key: String,
    /// Transport deadline for one request.
    pub timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl BinanceConfig {
    /// Default futures endpoint with the given API key.
    #[must_use]
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Replace the base URL (useful for testnets and local mocks).
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Replace the transport deadline.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://fapi.binance.com/fapi/v1".to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(60),
            user_agent: concat!("harvest-binance/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

// The API key never reaches logs.
impl fmt::Debug for BinanceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinanceConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}
