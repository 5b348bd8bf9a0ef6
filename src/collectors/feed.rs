//! HTTP collector for normalized JSON feeds
//!
//! Each source can point at an endpoint that already speaks the uniform
//! observation format:
//!
//! ```text
//! GET {endpoint}?mode=daily&limit=50[&terms=a,b]
//! Authorization: Bearer <api_key>        (optional)
//!
//! [{"keyword": "soy candle", "value": 71.0, "timestamp": "2024-07-10T11:00:00Z", "text": "..."}]
//! ```
//!
//! Requests are rate limited with governor and retried with exponential
//! backoff for recoverable failures (5xx, 429, timeouts, transport errors).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::{header::ACCEPT, Client};
use serde::Deserialize;
use std::num::NonZeroU32;
use url::Url;

use super::Collector;
use crate::config::{CollectionConfig, SourceConfig};
use crate::models::{CollectionMode, Observation, Source};
use crate::utils::error::CollectError;
use crate::utils::normalize_whitespace;
use crate::utils::retry::{with_retry_if, RetryConfig};

/// One item of a feed response
#[derive(Debug, Deserialize)]
struct FeedItem {
    keyword: String,
    value: f64,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    text: Option<String>,
}

pub struct FeedCollector {
    source: Source,

    /// HTTP client with configured timeout and compression
    client: Client,

    /// Rate limiter to control request frequency
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    retry: RetryConfig,
}

impl FeedCollector {
    /// # Errors
    ///
    /// Returns `CollectError::Http` if the HTTP client cannot be created
    pub fn new(source: Source, config: &CollectionConfig) -> Result<Self, CollectError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .gzip(true)
            .user_agent(config.user_agent.clone())
            .build()?;

        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        Ok(Self {
            source,
            client,
            rate_limiter,
            retry: RetryConfig::with_delays(
                config.max_retries,
                config.retry_base_delay_ms,
                30_000,
            ),
        })
    }

    /// Override retry behaviour
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn request_url(
        &self,
        endpoint: &str,
        mode: CollectionMode,
        settings: &SourceConfig,
    ) -> Result<Url, CollectError> {
        let mut url =
            Url::parse(endpoint).map_err(|e| CollectError::InvalidUrl(format!("{endpoint}: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("mode", mode.as_str());
            query.append_pair("limit", &settings.max_items.to_string());
            if !settings.terms.is_empty() {
                query.append_pair("terms", &settings.terms.join(","));
            }
        }
        Ok(url)
    }

    async fn fetch_once(&self, url: &Url, api_key: Option<&str>) -> Result<Vec<u8>, CollectError> {
        self.rate_limiter.until_ready().await;

        let mut request = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/json");
        if let Some(key) = api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CollectError::Status {
                platform: self.source,
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Decode a feed body, skipping malformed items
    fn decode(&self, body: &[u8]) -> Result<Vec<Observation>, CollectError> {
        let items: Vec<serde_json::Value> = serde_json::from_slice(body)
            .map_err(|e| CollectError::Decode(format!("expected a JSON array: {e}")))?;

        let mut observations = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match serde_json::from_value::<FeedItem>(item) {
                Ok(item) => {
                    let mut obs =
                        Observation::new(&item.keyword, self.source, item.value, item.timestamp);
                    if let Some(text) = item.text.as_deref().map(normalize_whitespace) {
                        if !text.is_empty() {
                            obs = obs.with_text(text);
                        }
                    }
                    observations.push(obs);
                }
                Err(e) => {
                    tracing::warn!(source = %self.source, index, error = %e, "Skipping malformed feed item");
                }
            }
        }
        Ok(observations)
    }
}

#[async_trait]
impl Collector for FeedCollector {
    fn source(&self) -> Source {
        self.source
    }

    async fn collect(
        &self,
        mode: CollectionMode,
        settings: &SourceConfig,
    ) -> Result<Vec<Observation>, CollectError> {
        let endpoint = settings
            .endpoint
            .as_deref()
            .ok_or(CollectError::NotConfigured(self.source))?;
        let url = self.request_url(endpoint, mode, settings)?;
        let api_key = settings.api_key.as_deref();

        tracing::debug!(source = %self.source, url = %url, "Requesting feed");

        let body = with_retry_if(
            &self.retry,
            || self.fetch_once(&url, api_key),
            CollectError::is_recoverable,
        )
        .await
        .map_err(|e| {
            if e.is_recoverable() {
                CollectError::MaxRetriesExceeded(format!("{}: {e}", self.source))
            } else {
                e
            }
        })?;

        let mut observations = self.decode(&body)?;
        observations.truncate(settings.max_items);

        tracing::info!(
            source = %self.source,
            %mode,
            count = observations.len(),
            "Feed collected"
        );
        Ok(observations)
    }
}
