//! Short-lived cache for price series responses

use crate::api::StockDataResponse;
use cached::{Cached, TimedCache};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Thread-safe TTL cache of stock-data responses keyed by symbol
#[derive(Clone)]
pub struct PriceCache {
    cache: Arc<RwLock<TimedCache<String, StockDataResponse>>>,
}

impl std::fmt::Debug for PriceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceCache").finish_non_exhaustive()
    }
}

impl PriceCache {
    /// Create a cache whose entries live for `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(TimedCache::with_lifespan(ttl))),
        }
    }

    fn key(symbol: &str) -> String {
        symbol.trim().to_uppercase()
    }

    pub async fn get(&self, symbol: &str) -> Option<StockDataResponse> {
        // TimedCache evicts on read, so even lookups need the write lock
        let mut cache = self.cache.write().await;
        cache.cache_get(&Self::key(symbol)).cloned()
    }

    pub async fn insert(&self, symbol: &str, response: StockDataResponse) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_set(Self::key(symbol), response);
    }

    /// Return the cached response or run `fetcher` and cache its success
    ///
    /// Errors are never cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, symbol: &str, fetcher: F) -> Result<StockDataResponse, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<StockDataResponse, E>>,
    {
        if let Some(hit) = self.get(symbol).await {
            tracing::debug!("Price cache hit for {}", symbol);
            return Ok(hit);
        }

        tracing::debug!("Price cache miss for {}", symbol);
        let response = fetcher().await?;
        self.insert(symbol, response.clone()).await;
        Ok(response)
    }

    /// Forget `symbol` so the next load goes to the backend
    pub async fn invalidate(&self, symbol: &str) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_remove(&Self::key(symbol));
    }
}
