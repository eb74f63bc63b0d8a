//! Outbound provider calls
//!
//! Every stage talks to its provider through a [`Fetcher`]: one GET, one
//! attempt, raw body back. Pacing is not the fetcher's business; each stage
//! owns a [`Throttle`] and awaits it after every call it issues.

use crate::error::{FetchError, RecordError};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// A single outbound GET request
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub url: String,
    /// Query parameters, URL-encoded by the fetcher
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl FetchRequest {
    #[must_use]
    pub fn get(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            params: Vec::new(),
            headers: Vec::new(),
            timeout,
        }
    }

    #[must_use]
    pub fn param(mut self, name: &str, value: impl ToString) -> Self {
        self.params.push((name.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// First value of query parameter `name`
    #[must_use]
    pub fn param_value(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Request URL with secrets left out, for logs
    #[must_use]
    pub fn describe(&self) -> String {
        let visible: Vec<String> = self
            .params
            .iter()
            .filter(|(key, _)| key != "appid")
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        if visible.is_empty() {
            self.url.clone()
        } else {
            format!("{}?{}", self.url, visible.join("&"))
        }
    }
}

/// Issues one request and returns the response body
pub trait Fetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<String, FetchError>;
}

impl<F: Fetcher> Fetcher for &F {
    async fn fetch(&self, request: &FetchRequest) -> Result<String, FetchError> {
        (**self).fetch(request).await
    }
}

/// Fetch and decode a JSON body into `T`. A body that does not match `T`
/// becomes a [`RecordError::Parse`] tagged with `context`.
pub async fn fetch_json<T, F>(fetcher: &F, request: &FetchRequest, context: &str) -> Result<T, RecordError>
where
    T: DeserializeOwned,
    F: Fetcher,
{
    let body = fetcher.fetch(request).await?;
    serde_json::from_str(&body).map_err(|e| RecordError::parse(context, e.to_string()))
}

/// Production fetcher backed by `reqwest`
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a new fetcher with a default user agent; requests may override it
    pub fn new() -> crate::Result<Self> {
        let client = Client::builder()
            .user_agent(format!("TripScout/{}", crate::VERSION))
            .build()
            .map_err(|e| crate::TripScoutError::general(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<String, FetchError> {
        let url = Url::parse_with_params(&request.url, &request.params).map_err(|e| {
            FetchError::Transport {
                url: request.url.clone(),
                message: format!("invalid URL: {e}"),
            }
        })?;

        let mut builder = self.client.get(url).timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let started = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(request, e))?;

        let status = response.status();
        debug!(
            "{} answered {} in {:.3}s",
            request.describe(),
            status,
            started.elapsed().as_secs_f64()
        );

        if !status.is_success() {
            return Err(FetchError::Status {
                url: request.url.clone(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| transport_error(request, e))
    }
}

fn transport_error(request: &FetchRequest, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: request.url.clone(),
            timeout: request.timeout,
        }
    } else {
        FetchError::Transport {
            url: request.url.clone(),
            message: error.to_string(),
        }
    }
}

/// Minimum pause between two calls of the same stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    interval: Duration,
}

impl Throttle {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    #[must_use]
    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sleep for the interval; a zero interval returns immediately
    pub async fn pause(&self) {
        if self.interval.is_zero() {
            return;
        }
        tokio::time::sleep(self.interval).await;
    }
}

/// Log a per-record failure with the record it concerns
pub(crate) fn log_skipped(stage: &str, subject: &str, error: &RecordError) {
    warn!("{stage}: skipping '{subject}': {error}");
}
