//! Time-bounded cache for remote calendar sources.
//!
//! Shields a flow's source URL from repeated network fetches. Entries
//! expire after the per-call cache duration; an expired entry is simply
//! overwritten on the next miss. Concurrent misses for the same key may
//! each fetch independently, an accepted trade-off over single-flight
//! coordination.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

/// Fetches larger than this are rejected before the body is read.
pub const MAX_CONTENT_LENGTH: u64 = 100_000_000; // 100 MB

/// Errors from fetching a remote source.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    #[error("exceeded max. content length of {MAX_CONTENT_LENGTH}")]
    ExceededContentLength,

    #[error("{0}")]
    Request(String),
}

/// Performs the actual retrieval of a source body.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Reject declared content lengths over the cap. `None` (no declared
/// length) passes; the cap only guards against sources that announce
/// an oversized body.
fn check_content_length(declared: Option<u64>) -> Result<(), FetchError> {
    match declared {
        Some(len) if len > MAX_CONTENT_LENGTH => Err(FetchError::ExceededContentLength),
        _ => Ok(()),
    }
}

/// HTTP fetcher backed by reqwest.
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        check_content_length(response.content_length())?;

        response
            .text()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))
    }
}

struct CacheEntry {
    body: String,
    expires_at: Instant,
}

/// Process-wide cache of fetched source bodies, keyed by URL.
pub struct SourceCache {
    fetcher: Arc<dyn SourceFetcher>,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl SourceCache {
    pub fn new(fetcher: Arc<dyn SourceFetcher>) -> Self {
        Self {
            fetcher,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached body for `url`, fetching and storing it for
    /// `cache_duration` on a miss or after expiry.
    pub async fn get(&self, url: &str, cache_duration: Duration) -> Result<String, FetchError> {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(url) {
                if entry.expires_at > Instant::now() {
                    tracing::debug!(url, "serving source from cache");
                    return Ok(entry.body.clone());
                }
            }
        }

        let body = self.fetcher.fetch(url).await?;
        tracing::info!(url, bytes = body.len(), "fetched remote source");

        let mut entries = self.entries.write().await;
        entries.insert(
            url.to_string(),
            CacheEntry {
                body: body.clone(),
                expires_at: Instant::now() + cache_duration,
            },
        );

        Ok(body)
    }
}
