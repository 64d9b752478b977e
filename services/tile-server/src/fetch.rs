//! Upstream vector tile fetching with retry.
//!
//! A [`TileSource`] performs one attempt; [`VectorTileFetcher`] wraps it in
//! the retry policy: up to N sequential attempts, no backoff, any failure
//! (including 404) retried.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

use tile_common::{TileError, TileResult};

use crate::metrics;

/// Why a single upstream attempt failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Transport(String),
}

/// One attempt at downloading a vector tile.
#[async_trait]
pub trait TileSource: Send + Sync {
    async fn get(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// reqwest-backed source with a fixed per-request timeout.
pub struct HttpTileSource {
    client: Client,
}

impl HttpTileSource {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .tcp_nodelay(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl TileSource for HttpTileSource {
    async fn get(&self, url: &str) -> Result<Bytes, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))
    }
}

/// Run `op` until it succeeds or `max_attempts` attempts have failed.
///
/// `op` receives the 1-based attempt number. Attempts run back to back.
/// `max_attempts == 0` still makes one attempt.
pub async fn retry<T, E, F, Fut>(max_attempts: u32, mut op: F) -> TileResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(attempt, max_attempts, error = %e, "Upstream attempt failed");
                if attempt >= max_attempts {
                    return Err(TileError::Network {
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
            }
        }
    }
}

/// Downloads vector tiles through a [`TileSource`] with retries.
#[derive(Clone)]
pub struct VectorTileFetcher {
    source: Arc<dyn TileSource>,
    max_attempts: u32,
}

impl VectorTileFetcher {
    pub fn new(source: Arc<dyn TileSource>, max_attempts: u32) -> Self {
        Self {
            source,
            max_attempts,
        }
    }

    pub async fn fetch(&self, url: &str) -> TileResult<Bytes> {
        let body = retry(self.max_attempts, |attempt| {
            let source = self.source.clone();
            async move {
                let result = source.get(url).await;
                metrics::record_fetch_attempt(result.is_ok());
                if result.is_ok() && attempt > 1 {
                    debug!(attempt, "Upstream fetch recovered");
                }
                result
            }
        })
        .await?;

        debug!(url = %url, bytes = body.len(), "Fetched vector tile");
        Ok(body)
    }
}
