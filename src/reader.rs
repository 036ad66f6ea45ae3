// Read path: the MetricsReader seam and its store-backed implementation.
// Resolve -> build query -> fetch -> post-process. Caching wraps this from the outside.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

use crate::analytics;
use crate::error::QueryResult;
use crate::metrics_repo::MetricsRepo;
use crate::metrics_repo::query_builder::{self, RankOrder};
use crate::models::{
    AggregateRow, CardinalityQuery, CardinalityResult, CompareQuery, CompareResult, ExtremesQuery,
    ExtremesResult, LatestQuery, LatestResult, RangeQuery, RankQuery, RankedEntity, Status,
    TrendQuery, TrendResult,
};
use crate::resolution;

/// Every analytic read operation. Implemented by the store reader and by the caching wrapper.
#[async_trait]
pub trait MetricsReader: Send + Sync {
    async fn range(&self, query: &RangeQuery) -> QueryResult<Vec<AggregateRow>>;
    async fn latest(&self, query: &LatestQuery) -> QueryResult<LatestResult>;
    async fn top(&self, query: &RankQuery) -> QueryResult<Vec<RankedEntity>>;
    async fn bottom(&self, query: &RankQuery) -> QueryResult<Vec<RankedEntity>>;
    async fn extremes(&self, query: &ExtremesQuery) -> QueryResult<ExtremesResult>;
    async fn cardinality(&self, query: &CardinalityQuery) -> QueryResult<CardinalityResult>;
    async fn compare(&self, query: &CompareQuery) -> QueryResult<CompareResult>;
    async fn trend(&self, query: &TrendQuery) -> QueryResult<TrendResult>;
}

/// Knobs applied after validation: result-size cap and trend flatness threshold.
#[derive(Debug, Clone, Copy)]
pub struct ReaderConfig {
    pub max_limit: u32,
    pub trend_epsilon: f64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_limit: 1000,
            trend_epsilon: analytics::DEFAULT_TREND_EPSILON,
        }
    }
}

/// Reader that queries the rollup store directly.
pub struct RepoReader {
    repo: Arc<MetricsRepo>,
    config: ReaderConfig,
}

impl RepoReader {
    pub fn new(repo: Arc<MetricsRepo>, config: ReaderConfig) -> Self {
        Self { repo, config }
    }

    async fn rank(&self, query: &RankQuery, order: RankOrder) -> QueryResult<Vec<RankedEntity>> {
        let t = resolution::resolve(query.resolution)?;
        let limit = query.limit.clamped(self.config.max_limit);
        let built = query_builder::rank(t, &query.metric, &query.scope, order, limit);
        self.repo.fetch_ranked(&built).await
    }
}

#[async_trait]
impl MetricsReader for RepoReader {
    #[instrument(skip(self, query), fields(operation = "range", metric = %query.metric, scope = %query.target.scope()))]
    async fn range(&self, query: &RangeQuery) -> QueryResult<Vec<AggregateRow>> {
        let t = resolution::resolve(query.resolution)?;
        let built = query_builder::range(t, &query.metric, &query.target, &query.window);
        self.repo.fetch_aggregate_rows(&built).await
    }

    #[instrument(skip(self, query), fields(operation = "latest", metric = %query.metric, scope = %query.target.scope()))]
    async fn latest(&self, query: &LatestQuery) -> QueryResult<LatestResult> {
        let t = resolution::resolve(query.resolution)?;
        let built = query_builder::latest(t, &query.metric, &query.target);
        let rows = self.repo.fetch_aggregate_rows(&built).await?;
        Ok(LatestResult::from_row(rows.into_iter().next()))
    }

    #[instrument(skip(self, query), fields(operation = "top", metric = %query.metric))]
    async fn top(&self, query: &RankQuery) -> QueryResult<Vec<RankedEntity>> {
        self.rank(query, RankOrder::Top).await
    }

    #[instrument(skip(self, query), fields(operation = "bottom", metric = %query.metric))]
    async fn bottom(&self, query: &RankQuery) -> QueryResult<Vec<RankedEntity>> {
        self.rank(query, RankOrder::Bottom).await
    }

    #[instrument(skip(self, query), fields(operation = "extremes"))]
    async fn extremes(&self, query: &ExtremesQuery) -> QueryResult<ExtremesResult> {
        let t = resolution::resolve(query.resolution)?;
        let metrics: Vec<&str> = analytics::headline_metric_names().collect();
        let built = query_builder::extremes(t, &metrics, &query.window);
        let rows = self.repo.fetch_extremes(&built).await?;
        let limit = query.limit.clamped(self.config.max_limit) as usize;
        Ok(analytics::partition_extremes(rows, limit))
    }

    #[instrument(skip(self, query), fields(operation = "cardinality", kind = query.kind.as_str()))]
    async fn cardinality(&self, query: &CardinalityQuery) -> QueryResult<CardinalityResult> {
        let t = resolution::resolve(query.resolution)?;
        let built = query_builder::cardinality(t, query.kind, query.window.as_ref());
        let value = self.repo.fetch_count(&built).await?;
        Ok(CardinalityResult {
            kind: query.kind,
            value,
        })
    }

    #[instrument(skip(self, query), fields(operation = "compare", metric = %query.metric, scope = %query.target.scope()))]
    async fn compare(&self, query: &CompareQuery) -> QueryResult<CompareResult> {
        let t = resolution::resolve(query.resolution)?;
        let before = query_builder::window_stats(t, &query.metric, &query.target, &query.before);
        let after = query_builder::window_stats(t, &query.metric, &query.target, &query.after);
        let (before, after) = tokio::try_join!(
            self.repo.fetch_window_stats(&before),
            self.repo.fetch_window_stats(&after)
        )?;
        Ok(CompareResult::from_windows(before, after))
    }

    #[instrument(skip(self, query), fields(operation = "trend", metric = %query.metric, scope = %query.target.scope()))]
    async fn trend(&self, query: &TrendQuery) -> QueryResult<TrendResult> {
        let t = resolution::resolve(query.resolution)?;
        let built = query_builder::range(t, &query.metric, &query.target, &query.window);
        let rows = self.repo.fetch_aggregate_rows(&built).await?;
        // x is seconds since the first bucket.
        let origin = rows.first().map_or(0, |r| r.bucket.timestamp());
        let points: Vec<(f64, f64)> = rows
            .iter()
            .map(|r| ((r.bucket.timestamp() - origin) as f64, r.avg))
            .collect();
        let fit = analytics::fit_line(&points);
        Ok(TrendResult {
            status: if points.is_empty() {
                Status::NoData
            } else {
                Status::Ok
            },
            points: points.len(),
            slope: fit.slope,
            intercept: fit.intercept,
            direction: analytics::detect_direction(fit.slope, self.config.trend_epsilon),
        })
    }
}
