//! Expiring cache entries plus pub/sub republish.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tickbar_aggregate::OhlcvSummary;
use tickbar_types::SinkError;

use crate::record::{aggregated_channel, cache_key};
use crate::{Sink, SummaryPayload};

/// Client for a key/value cache with publish support.
#[async_trait]
pub trait CacheClient: Send + Sync {
    /// Checks connectivity.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache is unreachable.
    async fn ping(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Stores `value` under `key`, expiring after `ttl`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write failed.
    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), SinkError>;

    /// Publishes `payload` on `channel`.
    ///
    /// # Errors
    ///
    /// Returns an error if the publish failed.
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), SinkError>;
}

/// Caches each summary under `<symbol>:<YYYYMMDD_HHMM>` and republishes it on
/// `<symbol>:aggregated`.
#[derive(Debug, Clone)]
pub struct CacheSink<C> {
    client: C,
    ttl: Duration,
}

impl<C: CacheClient> CacheSink<C> {
    /// Default cache entry lifetime (24 hours).
    pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

    /// Creates a sink with the default 24 hour expiry.
    #[must_use]
    pub const fn new(client: C) -> Self {
        Self {
            client,
            ttl: Self::DEFAULT_TTL,
        }
    }

    /// Sets the cache entry lifetime.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns the cache entry lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[async_trait]
impl<C: CacheClient> Sink for CacheSink<C> {
    fn name(&self) -> &str {
        "cache"
    }

    async fn ready(&self) -> Result<(), SinkError> {
        self.client.ping().await
    }

    async fn deliver(&self, summary: &OhlcvSummary) -> Result<(), SinkError> {
        let payload = serde_json::to_string(&SummaryPayload::from(summary))?;
        let key = cache_key(&summary.symbol, summary.minute_start);

        self.client.set_with_expiry(&key, &payload, self.ttl).await?;
        self.client
            .publish(&aggregated_channel(&summary.symbol), &payload)
            .await?;

        tracing::debug!(symbol = %summary.symbol, key = %key, "summary cached and published");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryCacheState {
    entries: HashMap<String, (String, Duration)>,
    published: Vec<(String, String)>,
    unavailable: bool,
}

/// In-process [`CacheClient`].
///
/// Clones share the same state. Expiry is recorded but not enforced.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    inner: Arc<Mutex<MemoryCacheState>>,
}

impl MemoryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with [`SinkError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Returns the value and lifetime stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<(String, Duration)> {
        self.lock().entries.get(key).cloned()
    }

    /// Returns every `(channel, payload)` published so far.
    #[must_use]
    pub fn published(&self) -> Vec<(String, String)> {
        self.lock().published.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryCacheState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(state: &MemoryCacheState) -> Result<(), SinkError> {
        if state.unavailable {
            return Err(SinkError::Unavailable("cache offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheClient for MemoryCache {
    async fn ping(&self) -> Result<(), SinkError> {
        Self::check(&self.lock())
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), SinkError> {
        let mut state = self.lock();
        Self::check(&state)?;
        state
            .entries
            .insert(key.to_string(), (value.to_string(), ttl));
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), SinkError> {
        let mut state = self.lock();
        Self::check(&state)?;
        state
            .published
            .push((channel.to_string(), payload.to_string()));
        Ok(())
    }
}
