// Metric point as pushed by agents, and the raw row as written by the ingestion writer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One sampled value. Immutable once sent; no identity beyond (host, vm, metric, ingestion time).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub host: String,
    pub vm: String,
    pub metric: String,
    pub value: f64,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl MetricPoint {
    pub fn new(host: impl Into<String>, vm: impl Into<String>, metric: impl Into<String>, value: f64) -> Self {
        Self {
            host: host.into(),
            vm: vm.into(),
            metric: metric.into(),
            value,
            tags: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Raw series row: the point plus `date` and second-precision `ts`, both taken from ingestion time.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSeriesRow {
    pub date: NaiveDate,
    pub ts: DateTime<Utc>,
    pub point: MetricPoint,
}

impl RawSeriesRow {
    /// Stamp a point with the batch ingestion time, truncated to whole seconds.
    pub fn stamp(point: MetricPoint, ingested_at: DateTime<Utc>) -> Self {
        let secs = ingested_at.timestamp();
        let ts = DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or(ingested_at);
        Self {
            date: ts.date_naive(),
            ts,
            point,
        }
    }
}
