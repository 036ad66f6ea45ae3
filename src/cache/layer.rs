// CachedReader: wraps any MetricsReader with cache-aside reads.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Duration;

use super::CacheBackend;
use super::key::{self, CacheKeyParts};
use crate::error::QueryResult;
use crate::models::{
    AggregateRow, CardinalityQuery, CardinalityResult, CompareQuery, CompareResult, ExtremesQuery,
    ExtremesResult, LatestQuery, LatestResult, RangeQuery, RankQuery, RankedEntity, TrendQuery,
    TrendResult,
};
use crate::reader::MetricsReader;

pub struct CachedReader<R> {
    inner: R,
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
}

impl<R: MetricsReader> CachedReader<R> {
    pub fn new(inner: R, backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self {
            inner,
            backend,
            ttl,
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Return the cached value for `key`, or run `load` and populate.
    /// Errors from `load` propagate and are never cached.
    async fn cached<T, F>(&self, key: String, load: F) -> QueryResult<T>
    where
        T: Serialize + DeserializeOwned + Send,
        F: Future<Output = QueryResult<T>> + Send,
    {
        match self.backend.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    tracing::debug!(key = %key, "cache hit");
                    return Ok(value);
                }
                Err(e) => tracing::warn!(key = %key, error = %e, "cache entry unreadable, reloading"),
            },
            Ok(None) => tracing::debug!(key = %key, "cache miss"),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache unavailable, reading from store");
                return load.await;
            }
        }

        let value = load.await?;
        match serde_json::to_string(&value) {
            Ok(raw) => {
                if let Err(e) = self.backend.set(&key, raw, self.ttl).await {
                    tracing::warn!(key = %key, error = %e, "cache populate failed");
                }
            }
            Err(e) => tracing::warn!(key = %key, error = %e, "cache serialize failed"),
        }
        Ok(value)
    }
}

#[async_trait]
impl<R: MetricsReader> MetricsReader for CachedReader<R> {
    async fn range(&self, query: &RangeQuery) -> QueryResult<Vec<AggregateRow>> {
        let key = query.cache_key(key::PREFIX_RANGE);
        self.cached(key, self.inner.range(query)).await
    }

    async fn latest(&self, query: &LatestQuery) -> QueryResult<LatestResult> {
        let key = query.cache_key(key::PREFIX_LATEST);
        self.cached(key, self.inner.latest(query)).await
    }

    async fn top(&self, query: &RankQuery) -> QueryResult<Vec<RankedEntity>> {
        let key = query.cache_key(key::PREFIX_TOP);
        self.cached(key, self.inner.top(query)).await
    }

    async fn bottom(&self, query: &RankQuery) -> QueryResult<Vec<RankedEntity>> {
        let key = query.cache_key(key::PREFIX_BOTTOM);
        self.cached(key, self.inner.bottom(query)).await
    }

    async fn extremes(&self, query: &ExtremesQuery) -> QueryResult<ExtremesResult> {
        let key = query.cache_key(key::PREFIX_EXTREMES);
        self.cached(key, self.inner.extremes(query)).await
    }

    async fn cardinality(&self, query: &CardinalityQuery) -> QueryResult<CardinalityResult> {
        let key = query.cache_key(key::PREFIX_CARDINALITY);
        self.cached(key, self.inner.cardinality(query)).await
    }

    async fn compare(&self, query: &CompareQuery) -> QueryResult<CompareResult> {
        let key = query.cache_key(key::PREFIX_COMPARE);
        self.cached(key, self.inner.compare(query)).await
    }

    async fn trend(&self, query: &TrendQuery) -> QueryResult<TrendResult> {
        let key = query.cache_key(key::PREFIX_TREND);
        self.cached(key, self.inner.trend(query)).await
    }
}
