#[cfg(feature = "test-adapters")]
use std::sync::Arc;

use async_trait::async_trait;
use harvest_core::HarvestError;
use reqwest::header::HeaderMap;

use crate::config::BinanceConfig;

/// Raw response of one GET request, before any classification.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Full response body.
    pub body: Vec<u8>,
}

/// HTTP abstraction (so tests can inject canned responses).
#[async_trait]
pub trait BinanceHttp: Send + Sync {
    /// Issue `GET {base}/{path}?{query}` and read the whole body.
    ///
    /// Only transport failures are errors here; every status is returned as
    /// a response.
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<HttpResponse, HarvestError>;
}

/// Production adapter backed by `reqwest`.
///
/// `reqwest::Client` is `Clone + Send + Sync`, so no external locking is needed.
#[derive(Clone)]
pub struct RealAdapter {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RealAdapter {
    /// Build a client with the configured deadline and user agent.
    ///
    /// # Errors
    /// Returns `InvalidArg` when the HTTP client cannot be constructed.
    pub fn new(config: &BinanceConfig) -> Result<Self, HarvestError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| HarvestError::InvalidArg(format!("http client: {e}")))?;
        Ok(Self::with_client(http, config))
    }

    /// Wrap an existing `reqwest::Client`.
    #[must_use]
    pub fn with_client(http: reqwest::Client, config: &BinanceConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }
}

fn map_reqwest_err(e: &reqwest::Error, context: &str) -> HarvestError {
    if e.is_timeout() {
        HarvestError::transport(format!("{context}: timed out"))
    } else if e.is_connect() {
        HarvestError::transport(format!("{context}: connect: {e}"))
    } else {
        HarvestError::transport(format!("{context}: {e}"))
    }
}

#[async_trait]
impl BinanceHttp for RealAdapter {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<HttpResponse, HarvestError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let resp = self
            .http
            .get(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .query(query)
            .send()
            .await
            .map_err(|e| map_reqwest_err(&e, path))?;
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let body = resp
            .bytes()
            .await
            .map_err(|e| map_reqwest_err(&e, path))?
            .to_vec();
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(feature = "test-adapters")]
impl dyn BinanceHttp {
    /// Test helper that builds a `BinanceHttp` from a closure taking the
    /// endpoint path and query pairs.
    pub fn from_fn<F>(f: F) -> Arc<dyn BinanceHttp>
    where
        F: Send + Sync + 'static + Fn(&str, &[(&str, String)]) -> Result<HttpResponse, HarvestError>,
    {
        struct FnHttp<F>(F);

        #[async_trait]
        impl<F> BinanceHttp for FnHttp<F>
        where
            F: Send
                + Sync
                + 'static
                + Fn(&str, &[(&str, String)]) -> Result<HttpResponse, HarvestError>,
        {
            async fn get(
                &self,
                path: &str,
                query: &[(&str, String)],
            ) -> Result<HttpResponse, HarvestError> {
                (self.0)(path, query)
            }
        }
        Arc::new(FnHttp(f))
    }
}
