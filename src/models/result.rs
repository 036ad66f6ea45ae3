// Analytic results as returned to callers and stored in the cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::query::CardinalityKind;
use crate::analytics::{self, Direction};

/// Distinguishes an empty result from a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    NoData,
}

/// One merged rollup bucket. host/vm are present when the scope grouped by them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub bucket: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm: Option<String>,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestResult {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<AggregateRow>,
}

impl LatestResult {
    pub fn from_row(row: Option<AggregateRow>) -> Self {
        let status = if row.is_some() { Status::Ok } else { Status::NoData };
        Self { status, row }
    }
}

/// Entity ranked by top/bottom queries. `vm` is absent when ranking hosts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntity {
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm: Option<String>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtremeEntry {
    pub host: String,
    pub vm: String,
    pub value: f64,
}

/// Per headline metric, the worst entities first.
pub type ExtremesResult = BTreeMap<String, Vec<ExtremeEntry>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardinalityResult {
    pub kind: CardinalityKind,
    pub value: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareResult {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Stats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Stats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<Stats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<Stats>,
}

impl CompareResult {
    /// Deltas are only computed when both windows have data.
    pub fn from_windows(before: Option<Stats>, after: Option<Stats>) -> Self {
        let (Some(before), Some(after)) = (before, after) else {
            return Self {
                status: Status::NoData,
                before: None,
                after: None,
                delta: None,
                percent: None,
            };
        };
        let delta = Stats {
            avg: analytics::delta(before.avg, after.avg),
            min: analytics::delta(before.min, after.min),
            max: analytics::delta(before.max, after.max),
        };
        let percent = Stats {
            avg: analytics::percent(before.avg, after.avg),
            min: analytics::percent(before.min, after.min),
            max: analytics::percent(before.max, after.max),
        };
        Self {
            status: Status::Ok,
            before: Some(before),
            after: Some(after),
            delta: Some(delta),
            percent: Some(percent),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub status: Status,
    pub points: usize,
    /// Value change per second.
    pub slope: f64,
    /// Fitted value at x = 0, where x is seconds since the first bucket with data
    /// (not since the Unix epoch).
    pub intercept: f64,
    pub direction: Direction,
}
