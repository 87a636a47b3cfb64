//! REST client for the ticker snapshot endpoint.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use crate::{error::FetchError, ticker::Snapshot};

/// Default public CoinDCX ticker endpoint.
pub const DEFAULT_TICKER_URL: &str = "https://api.coindcx.com/exchange/ticker";

/// Default bound on a single ticker request.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Anything able to produce a fresh ticker [`Snapshot`].
#[async_trait]
pub trait TickerSource: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<Snapshot, FetchError>;
}

#[async_trait]
impl<Source> TickerSource for std::sync::Arc<Source>
where
    Source: TickerSource + ?Sized,
{
    async fn fetch_snapshot(&self) -> Result<Snapshot, FetchError> {
        (**self).fetch_snapshot().await
    }
}

/// Ticker client configuration
#[derive(Debug, Clone)]
pub struct TickerClientConfig {
    /// Ticker endpoint URL
    pub url: Url,
    /// Bound on connect + response time for a single request
    pub timeout: Duration,
}

impl TickerClientConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// [`TickerSource`] backed by a plain HTTP `GET` with no auth and no query.
#[derive(Debug, Clone)]
pub struct TickerClient {
    http: reqwest::Client,
    config: TickerClientConfig,
}

impl TickerClient {
    pub fn new(config: TickerClientConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|error| FetchError::Transport(error.to_string()))?;

        Ok(Self::from_parts(http, config))
    }

    /// Use a pre-built [`reqwest::Client`]; its own timeout settings are kept as-is.
    pub fn from_parts(http: reqwest::Client, config: TickerClientConfig) -> Self {
        Self { http, config }
    }

    pub fn url(&self) -> &Url {
        &self.config.url
    }

    fn timeout_ms(&self) -> u64 {
        self.config.timeout.as_millis() as u64
    }
}

#[async_trait]
impl TickerSource for TickerClient {
    async fn fetch_snapshot(&self) -> Result<Snapshot, FetchError> {
        let timeout_ms = self.timeout_ms();

        let response = self
            .http
            .get(self.config.url.clone())
            .send()
            .await
            .map_err(|error| FetchError::from_reqwest(error, timeout_ms))?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %self.config.url, %status, "ticker endpoint returned error status");
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|error| FetchError::from_reqwest(error, timeout_ms))?;

        let snapshot = Snapshot::decode(&body)?;
        debug!(
            records = snapshot.len(),
            rejected = snapshot.rejected,
            "fetched ticker snapshot"
        );

        Ok(snapshot)
    }
}
