// Derived analytics: deltas, least-squares trend, per-metric extreme ranking.
// Pure functions; the reader applies them to rows fetched from the store.

use serde::{Deserialize, Serialize};

use crate::models::{ExtremeEntry, ExtremesResult};

/// Default slope threshold below which a trend is flat.
pub const DEFAULT_TREND_EPSILON: f64 = 1e-4;

pub fn delta(before: f64, after: f64) -> f64 {
    after - before
}

/// Percent change from `before` to `after`. A zero baseline reports 100.
pub fn percent(before: f64, after: f64) -> f64 {
    if before == 0.0 {
        100.0
    } else {
        (after - before) / before * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

/// Ordinary least squares over `(x, y)` pairs.
///
/// Zero points fit `(0, 0)`, one point fits a flat line through it. With two or more
/// points sharing the same `x` the denominator is zero and the result is NaN.
pub fn fit_line(points: &[(f64, f64)]) -> LinearFit {
    match points {
        [] => LinearFit {
            slope: 0.0,
            intercept: 0.0,
        },
        [(_, y)] => LinearFit {
            slope: 0.0,
            intercept: *y,
        },
        _ => {
            let n = points.len() as f64;
            let (sx, sy, sxy, sxx) = points.iter().fold(
                (0.0, 0.0, 0.0, 0.0),
                |(sx, sy, sxy, sxx), &(x, y)| (sx + x, sy + y, sxy + x * y, sxx + x * x),
            );
            let slope = (n * sxy - sx * sy) / (n * sxx - sx * sx);
            let intercept = (sy - slope * sx) / n;
            LinearFit { slope, intercept }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Flat,
}

pub fn detect_direction(slope: f64, epsilon: f64) -> Direction {
    if slope > epsilon {
        Direction::Up
    } else if slope < -epsilon {
        Direction::Down
    } else {
        Direction::Flat
    }
}

/// Order in which the "worst" values of a metric come first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Headline metrics covered by the extremes query, with their ranking order.
pub const HEADLINE_METRICS: &[(&str, SortOrder)] = &[
    ("cpu_usage", SortOrder::Desc),
    ("ram_used_pct", SortOrder::Asc),
    ("ram_available_bytes", SortOrder::Asc),
    ("disk_used_pct", SortOrder::Desc),
    ("load_1_norm", SortOrder::Desc),
    ("net_bytes_recv", SortOrder::Desc),
];

/// Ranking order for a metric; metrics outside the headline table rank descending.
pub fn sort_order(metric: &str) -> SortOrder {
    HEADLINE_METRICS
        .iter()
        .find(|(name, _)| *name == metric)
        .map_or(SortOrder::Desc, |(_, order)| *order)
}

pub fn headline_metric_names() -> impl Iterator<Item = &'static str> {
    HEADLINE_METRICS.iter().map(|(name, _)| *name)
}

/// Sort candidates by the metric's order and keep the first `limit`. Ties keep input order.
pub fn rank_extremes(metric: &str, mut candidates: Vec<ExtremeEntry>, limit: usize) -> Vec<ExtremeEntry> {
    match sort_order(metric) {
        SortOrder::Asc => candidates.sort_by(|a, b| a.value.total_cmp(&b.value)),
        SortOrder::Desc => candidates.sort_by(|a, b| b.value.total_cmp(&a.value)),
    }
    candidates.truncate(limit);
    candidates
}

/// Split `(metric, entry)` rows per metric and rank each list independently.
/// Every headline metric gets a key, empty when the window had no data for it.
pub fn partition_extremes(
    rows: impl IntoIterator<Item = (String, ExtremeEntry)>,
    limit: usize,
) -> ExtremesResult {
    let mut grouped: ExtremesResult = headline_metric_names()
        .map(|name| (name.to_string(), Vec::new()))
        .collect();
    for (metric, entry) in rows {
        grouped.entry(metric).or_default().push(entry);
    }
    grouped
        .into_iter()
        .map(|(metric, candidates)| {
            let ranked = rank_extremes(&metric, candidates, limit);
            (metric, ranked)
        })
        .collect()
}
