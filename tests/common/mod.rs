// Shared test helpers: temp-dir store, fixed timestamps, points

use chrono::{DateTime, Utc};
use hostmetrics::ingest::IngestWriter;
use hostmetrics::metrics_repo::MetricsRepo;
use hostmetrics::models::MetricPoint;
use std::sync::Arc;
use tempfile::TempDir;

/// Hour-aligned epoch second (so also minute- and 5-minute-aligned).
pub const BASE: i64 = 1_699_999_200;

pub fn ts(offset_secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(BASE + offset_secs, 0).unwrap()
}

pub fn point(host: &str, vm: &str, metric: &str, value: f64) -> MetricPoint {
    MetricPoint::new(host, vm, metric, value)
}

/// Fresh initialized store in a temp dir. Keep the TempDir alive for the test's duration.
pub async fn temp_repo() -> (TempDir, Arc<MetricsRepo>) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("metrics.db");
    let repo = MetricsRepo::connect(path.to_str().unwrap(), 2).await.unwrap();
    repo.init().await.unwrap();
    (dir, Arc::new(repo))
}

/// Ingest one batch stamped at BASE + offset_secs.
pub async fn ingest_at(writer: &IngestWriter, offset_secs: i64, batch: Vec<MetricPoint>) {
    writer.ingest_at(batch, ts(offset_secs)).await.unwrap();
}
