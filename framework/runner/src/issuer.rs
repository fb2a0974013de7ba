use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::Context;

use crate::config::RunConfig;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A request could not be completed. Fatal to the worker that issued it.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request to {url} timed out")]
    Timeout {
        url: String,
        #[source]
        source: BoxError,
    },
    #[error("could not connect to {url}")]
    Connect {
        url: String,
        #[source]
        source: BoxError,
    },
    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: BoxError,
    },
}

impl TransportError {
    pub fn from_reqwest(url: &url::Url, err: reqwest::Error) -> Self {
        let url = url.to_string();
        if err.is_timeout() {
            TransportError::Timeout {
                url,
                source: err.into(),
            }
        } else if err.is_connect() {
            TransportError::Connect {
                url,
                source: err.into(),
            }
        } else {
            TransportError::Request {
                url,
                source: err.into(),
            }
        }
    }
}

/// Performs one request at a time for a single worker.
///
/// Any response from the server is a success, whatever its status. Only a failure to complete the
/// exchange is an error.
pub trait RequestIssuer: Send + 'static {
    /// Issue one request and report how long it took, including reading the whole response.
    fn issue(&mut self) -> impl Future<Output = Result<Duration, TransportError>>;
}

/// Plain HTTP GET against the target URL.
///
/// Each issuer has its own client, so connections are pooled per worker and reused across the
/// requests of every burst.
#[derive(Debug, Clone)]
pub struct HttpRequestIssuer {
    client: reqwest::Client,
    url: url::Url,
}

impl HttpRequestIssuer {
    pub fn new(config: &RunConfig) -> anyhow::Result<Self> {
        let url = url::Url::parse(&config.target_url)
            .with_context(|| format!("Invalid target URL: {}", config.target_url))?;

        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(config.max_idle_connections)
            .timeout(config.request_timeout)
            .http1_only()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, url })
    }
}

impl RequestIssuer for HttpRequestIssuer {
    async fn issue(&mut self) -> Result<Duration, TransportError> {
        let started = Instant::now();

        let mut response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&self.url, e))?;
        let status = response.status();

        // Drain the body so that the connection goes back to the pool.
        let mut body_len = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| TransportError::from_reqwest(&self.url, e))?
        {
            body_len += chunk.len();
        }

        let elapsed = started.elapsed();
        log::trace!(
            "GET {} returned {} with {} byte(s) in {:?}",
            self.url,
            status,
            body_len,
            elapsed
        );

        Ok(elapsed)
    }
}
