use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::{fmt::Debug, time::Duration};
use tracing::{debug, warn};

use crate::{
    Config,
    cache::{CachingTransport, DiskCache},
    error::FetchError,
};

/// A GET request: endpoint plus query pairs in the order they were added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), query: Vec::new() }
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Canonical form used as cache key: the URL with query pairs sorted.
    pub fn signature(&self) -> String {
        let mut pairs = self.query.clone();
        pairs.sort();

        match Url::parse_with_params(&self.url, &pairs) {
            Ok(url) => url.to_string(),
            Err(_) => {
                let query: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
                format!("{}?{}", self.url, query.join("&"))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiReply {
    pub status: u16,
    pub body: String,
}

impl ApiReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Any HTTP response is `Ok`; only failures to get one are `Err`.
    async fn get(&self, request: &ApiRequest) -> Result<ApiReply, FetchError>;
}

#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self { http: Client::new() }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: &ApiRequest) -> Result<ApiReply, FetchError> {
        let network = |e: reqwest::Error| FetchError::Network {
            url: request.url.clone(),
            message: e.to_string(),
        };

        let res = self
            .http
            .get(&request.url)
            .query(&request.query)
            .send()
            .await
            .map_err(network)?;

        let status = res.status().as_u16();
        let body = res.text().await.map_err(network)?;

        debug!(url = %request.url, status, bytes = body.len(), "received response");
        Ok(ApiReply { status, body })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub backoff_factor: Duration,
    pub max_backoff: Duration,
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_factor: Duration::from_millis(200),
            max_backoff: Duration::from_secs(120),
            retry_statuses: vec![500, 502, 504],
        }
    }
}

impl RetryPolicy {
    /// Sleep before the given 1-based attempt: none before the first, then
    /// `backoff_factor * 2^(attempt - 2)` up to `max_backoff`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt < 2 {
            return Duration::ZERO;
        }
        let exp = 2u32.saturating_pow(attempt - 2);
        self.backoff_factor.saturating_mul(exp).min(self.max_backoff)
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }
}

/// Retries transient failures of the wrapped transport with exponential backoff.
#[derive(Debug)]
pub struct RetryTransport<T: Transport> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: Transport> RetryTransport<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<T: Transport> Transport for RetryTransport<T> {
    async fn get(&self, request: &ApiRequest) -> Result<ApiReply, FetchError> {
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=self.policy.max_attempts {
            let delay = self.policy.delay_before(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            match self.inner.get(request).await {
                Ok(reply) if self.policy.is_retryable_status(reply.status) => {
                    last_error = format!("HTTP status {}", reply.status);
                }
                Ok(reply) => return Ok(reply),
                Err(FetchError::Network { message, .. }) => {
                    last_error = message;
                }
                Err(other) => return Err(other),
            }

            if attempt < self.policy.max_attempts {
                warn!(
                    attempt,
                    max_attempts = self.policy.max_attempts,
                    next_delay_ms = self.policy.delay_before(attempt + 1).as_millis() as u64,
                    error = %last_error,
                    "transient failure, retrying"
                );
            }
        }

        Err(FetchError::RetriesExhausted {
            url: request.url.clone(),
            attempts: self.policy.max_attempts,
            last_error,
        })
    }
}

/// Assemble the transport stack described by the config: cache over retry over HTTP.
pub fn transport_from_config(config: &Config) -> Result<Box<dyn Transport>> {
    let retrying = RetryTransport::new(HttpTransport::new(), config.retry_policy());

    if !config.cache.enabled {
        return Ok(Box::new(retrying));
    }

    let cache = DiskCache::open(config.cache_dir()?, config.cache_ttl())?;
    Ok(Box::new(CachingTransport::new(retrying, cache)))
}
