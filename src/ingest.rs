// Ingestion writer: stamps a batch with one ingestion time and bulk-inserts it.
// Points never carry their own timestamp; the server clock decides the bucket.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::instrument;

use crate::error::QueryResult;
use crate::metrics_repo::MetricsRepo;
use crate::models::{MetricPoint, RawSeriesRow};

pub struct IngestWriter {
    repo: Arc<MetricsRepo>,
    points_written_total: AtomicU64,
}

impl IngestWriter {
    pub fn new(repo: Arc<MetricsRepo>) -> Self {
        Self {
            repo,
            points_written_total: AtomicU64::new(0),
        }
    }

    pub async fn ingest(&self, batch: Vec<MetricPoint>) -> QueryResult<u64> {
        self.ingest_at(batch, Utc::now()).await
    }

    /// All-or-nothing: the whole batch lands in one transaction or none of it does.
    #[instrument(skip(self, batch), fields(operation = "ingest", points_count = batch.len()))]
    pub async fn ingest_at(&self, batch: Vec<MetricPoint>, now: DateTime<Utc>) -> QueryResult<u64> {
        if batch.is_empty() {
            return Ok(0);
        }
        let rows: Vec<RawSeriesRow> = batch
            .into_iter()
            .map(|p| RawSeriesRow::stamp(p, now))
            .collect();
        let n = self.repo.insert_raw_rows(&rows).await?;
        self.points_written_total.fetch_add(n, Ordering::Relaxed);
        tracing::debug!(points_count = n, "batch ingested");
        Ok(n)
    }

    pub fn points_written_total(&self) -> u64 {
        self.points_written_total.load(Ordering::Relaxed)
    }
}
