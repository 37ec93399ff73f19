use moka::future::Cache as MokaCache;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Display;
use std::time::Duration;

/// Short-lived response cache
///
/// Quote previews are cached briefly so repeated reads don't burn the quote
/// source's request quota. Errors are never cached.
#[derive(Clone)]
pub struct Cache {
    inner: MokaCache<String, Value>,
}

impl Cache {
    /// Create a new cache with default configuration
    /// - 100 entries, 60 seconds TTL
    pub fn new() -> Self {
        Self::with_config(100, 60)
    }

    /// Create a new cache with custom configuration
    pub fn with_config(capacity: u64, ttl_secs: u64) -> Self {
        let inner = MokaCache::builder()
            .max_capacity(capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { inner }
    }

    /// Cached function execution that returns the deserialized type
    ///
    /// Checks the cache first; on a miss, awaits `fetch_fn`, stores the
    /// result as JSON and returns it.
    ///
    /// # Arguments
    /// * `cache_key` - The key to store/retrieve from cache
    /// * `fetch_fn` - Async function that fetches the data if cache miss
    pub async fn cached<F, T, E>(&self, cache_key: String, fetch_fn: F) -> Result<T, E>
    where
        F: std::future::Future<Output = Result<T, E>>,
        T: Serialize + for<'de> Deserialize<'de>,
    {
        if let Some(cached_data) = self.inner.get(&cache_key).await {
            match serde_json::from_value(cached_data) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    log::warn!("Discarding undecodable cache entry {}: {}", cache_key, e);
                    self.inner.invalidate(&cache_key).await;
                }
            }
        }

        let result = fetch_fn.await?;

        match serde_json::to_value(&result) {
            Ok(value) => self.inner.insert(cache_key, value).await,
            Err(e) => log::warn!("Not caching {}: {}", cache_key, e),
        }

        Ok(result)
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper to build consistent cache keys across the application
pub struct CacheKey {
    namespace: String,
    parts: Vec<String>,
}

impl CacheKey {
    /// Create a new cache key with a namespace
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            parts: Vec::new(),
        }
    }

    /// Add a part to the cache key
    pub fn with(mut self, part: impl Display) -> Self {
        self.parts.push(part.to_string());
        self
    }

    /// Build the final cache key string
    pub fn build(self) -> String {
        if self.parts.is_empty() {
            self.namespace
        } else {
            format!("{}:{}", self.namespace, self.parts.join(":"))
        }
    }
}
