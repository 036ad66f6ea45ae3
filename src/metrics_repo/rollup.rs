// Partial aggregate state and background merging of rollup rows.
// Merging never changes what a read returns: reads already fold all partial rows of a bucket.

use std::collections::BTreeMap;

use sqlx::{Row, SqlitePool};

use crate::error::QueryResult;
use crate::resolution::RollupTarget;

/// Mergeable sum/count/min/max state for one bucket key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartialAggregate {
    pub sum: f64,
    pub count: i64,
    pub min: f64,
    pub max: f64,
}

impl PartialAggregate {
    pub fn from_value(value: f64) -> Self {
        Self {
            sum: value,
            count: 1,
            min: value,
            max: value,
        }
    }

    /// Associative and commutative combination of two states.
    pub fn merge(&self, other: &PartialAggregate) -> PartialAggregate {
        PartialAggregate {
            sum: self.sum + other.sum,
            count: self.count + other.count,
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn avg(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Identity of a rollup row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RollupKey {
    pub bucket: i64,
    pub host: String,
    pub vm: String,
    pub metric: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RollupRow {
    pub key: RollupKey,
    pub state: PartialAggregate,
}

/// Fold partial rows sharing a key into one row per key, ordered by key.
pub fn merge_partials(rows: impl IntoIterator<Item = RollupRow>) -> Vec<RollupRow> {
    let mut by_key: BTreeMap<RollupKey, PartialAggregate> = BTreeMap::new();
    for row in rows {
        by_key
            .entry(row.key)
            .and_modify(|s| *s = s.merge(&row.state))
            .or_insert(row.state);
    }
    by_key
        .into_iter()
        .map(|(key, state)| RollupRow { key, state })
        .collect()
}

/// Merge every key with more than one partial row in buckets starting at or before `last_settled`.
/// Returns the number of keys merged.
pub(super) async fn compact(
    pool: &SqlitePool,
    t: RollupTarget,
    last_settled: i64,
) -> QueryResult<u64> {
    let (table, b) = (t.table, t.bucket_column);
    let mut tx = pool.begin().await?;

    let rows = sqlx::query(&format!(
        "SELECT {b} AS bucket, host, vm, metric, sum_value, cnt_value, min_value, max_value
         FROM {table}
         WHERE ({b}, host, vm, metric) IN (
             SELECT {b}, host, vm, metric FROM {table}
             WHERE {b} <= ?
             GROUP BY {b}, host, vm, metric
             HAVING COUNT(*) > 1
         )"
    ))
    .bind(last_settled)
    .fetch_all(&mut *tx)
    .await?;

    if rows.is_empty() {
        return Ok(0);
    }

    let mut partials = Vec::with_capacity(rows.len());
    for row in rows {
        partials.push(RollupRow {
            key: RollupKey {
                bucket: row.try_get("bucket")?,
                host: row.try_get("host")?,
                vm: row.try_get("vm")?,
                metric: row.try_get("metric")?,
            },
            state: PartialAggregate {
                sum: row.try_get("sum_value")?,
                count: row.try_get("cnt_value")?,
                min: row.try_get("min_value")?,
                max: row.try_get("max_value")?,
            },
        });
    }

    let merged = merge_partials(partials);
    let delete_sql =
        format!("DELETE FROM {table} WHERE {b} = ? AND host = ? AND vm = ? AND metric = ?");
    let insert_sql = format!(
        "INSERT INTO {table} ({b}, host, vm, metric, sum_value, cnt_value, min_value, max_value)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
    );
    for row in &merged {
        sqlx::query(&delete_sql)
            .bind(row.key.bucket)
            .bind(&row.key.host)
            .bind(&row.key.vm)
            .bind(&row.key.metric)
            .execute(&mut *tx)
            .await?;
        sqlx::query(&insert_sql)
            .bind(row.key.bucket)
            .bind(&row.key.host)
            .bind(&row.key.vm)
            .bind(&row.key.metric)
            .bind(row.state.sum)
            .bind(row.state.count)
            .bind(row.state.min)
            .bind(row.state.max)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(merged.len() as u64)
}
