// SQLite metrics store: raw series plus 1m/5m/1h rollups holding partial aggregate state.

pub mod query_builder;
pub mod rollup;
mod schema;

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Sqlite;
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

use crate::error::{QueryError, QueryResult};
use crate::models::{AggregateRow, ExtremeEntry, RankedEntity, RawSeriesRow, Resolution, Stats};
use crate::resolution;
use query_builder::{BuiltQuery, SqlValue};

pub struct MetricsRepo {
    pool: SqlitePool,
}

impl MetricsRepo {
    /// Connect to SQLite at `path`, create parent dir and DB if missing, enable WAL + pragmas.
    pub async fn connect(path: &str, max_pool_size: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        schema::init_schema(&self.pool).await
    }

    /// Insert a stamped batch in one transaction. Triggers append the rollup partial states.
    #[instrument(skip(self, rows), fields(repo = "metrics", operation = "insert_raw_rows", rows_count = rows.len()))]
    pub async fn insert_raw_rows(&self, rows: &[RawSeriesRow]) -> QueryResult<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await?;
        for row in rows {
            let tags = serde_json::to_string(&row.point.tags)
                .map_err(|e| QueryError::Conversion(format!("tags: {e}")))?;
            sqlx::query(
                "INSERT INTO metrics_raw (date, ts, host, vm, metric, value, tags) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(row.date.format("%Y-%m-%d").to_string())
            .bind(row.ts.timestamp())
            .bind(&row.point.host)
            .bind(&row.point.vm)
            .bind(&row.point.metric)
            .bind(row.point.value)
            .bind(&tags)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(rows.len() as u64)
    }

    /// Rows of a range/latest/trend query: bucket, host?, vm?, avg, min, max.
    #[instrument(skip(self, query), fields(repo = "metrics", operation = "fetch_aggregate_rows"))]
    pub async fn fetch_aggregate_rows(&self, query: &BuiltQuery) -> QueryResult<Vec<AggregateRow>> {
        let rows = self.fetch_all(query).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let bucket: i64 = row.try_get("bucket")?;
            out.push(AggregateRow {
                bucket: bucket_time(bucket)?,
                host: row.try_get("host")?,
                vm: row.try_get("vm")?,
                avg: row.try_get("avg")?,
                min: row.try_get("min")?,
                max: row.try_get("max")?,
            });
        }
        Ok(out)
    }

    #[instrument(skip(self, query), fields(repo = "metrics", operation = "fetch_ranked"))]
    pub async fn fetch_ranked(&self, query: &BuiltQuery) -> QueryResult<Vec<RankedEntity>> {
        let rows = self.fetch_all(query).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(RankedEntity {
                host: row.try_get("host")?,
                vm: row.try_get("vm")?,
                value: row.try_get("value")?,
            });
        }
        Ok(out)
    }

    /// `(metric, entry)` pairs in store order.
    #[instrument(skip(self, query), fields(repo = "metrics", operation = "fetch_extremes"))]
    pub async fn fetch_extremes(&self, query: &BuiltQuery) -> QueryResult<Vec<(String, ExtremeEntry)>> {
        let rows = self.fetch_all(query).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push((
                row.try_get("metric")?,
                ExtremeEntry {
                    host: row.try_get("host")?,
                    vm: row.try_get("vm")?,
                    value: row.try_get("value")?,
                },
            ));
        }
        Ok(out)
    }

    #[instrument(skip(self, query), fields(repo = "metrics", operation = "fetch_count"))]
    pub async fn fetch_count(&self, query: &BuiltQuery) -> QueryResult<u64> {
        log_query(query);
        let value: i64 = bind_all(query).fetch_one(&self.pool).await?.try_get("value")?;
        u64::try_from(value).map_err(|e| QueryError::Conversion(format!("count: {e}")))
    }

    /// Window aggregate; `None` when the window holds no samples.
    #[instrument(skip(self, query), fields(repo = "metrics", operation = "fetch_window_stats"))]
    pub async fn fetch_window_stats(&self, query: &BuiltQuery) -> QueryResult<Option<Stats>> {
        log_query(query);
        let row = bind_all(query).fetch_one(&self.pool).await?;
        let samples: i64 = row.try_get("samples")?;
        if samples == 0 {
            return Ok(None);
        }
        let avg: Option<f64> = row.try_get("avg")?;
        let min: Option<f64> = row.try_get("min")?;
        let max: Option<f64> = row.try_get("max")?;
        match (avg, min, max) {
            (Some(avg), Some(min), Some(max)) => Ok(Some(Stats { avg, min, max })),
            _ => Ok(None),
        }
    }

    /// Merge partial rows of settled buckets in every rollup table. Returns keys merged.
    #[instrument(skip(self), fields(repo = "metrics", operation = "compact_rollups"))]
    pub async fn compact_rollups(&self, settled_before: DateTime<Utc>) -> QueryResult<u64> {
        let mut merged = 0;
        for r in Resolution::ALL {
            let t = resolution::resolve(r)?;
            // A bucket is settled once its whole interval ends at or before the cutoff.
            let last_settled = settled_before.timestamp() - r.bucket_seconds();
            merged += rollup::compact(&self.pool, t, last_settled).await?;
        }
        Ok(merged)
    }

    /// Delete raw rows older than `raw_before` and rollup rows older than `rollup_before`.
    #[instrument(skip(self), fields(repo = "metrics", operation = "prune_old_data"))]
    pub async fn prune_old_data(
        &self,
        raw_before: DateTime<Utc>,
        rollup_before: DateTime<Utc>,
    ) -> QueryResult<u64> {
        let mut deleted = sqlx::query("DELETE FROM metrics_raw WHERE ts < $1")
            .bind(raw_before.timestamp())
            .execute(&self.pool)
            .await?
            .rows_affected();
        for r in Resolution::ALL {
            let t = resolution::resolve(r)?;
            deleted += sqlx::query(&format!(
                "DELETE FROM {} WHERE {} < $1",
                t.table, t.bucket_column
            ))
            .bind(rollup_before.timestamp())
            .execute(&self.pool)
            .await?
            .rows_affected();
        }
        Ok(deleted)
    }

    /// Number of partial rows stored for a resolution (all keys).
    pub async fn count_partial_rows(&self, resolution: Resolution) -> QueryResult<u64> {
        let t = resolution::resolve(resolution)?;
        let n: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", t.table))
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }

    pub async fn count_raw_rows(&self) -> QueryResult<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM metrics_raw")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }

    /// Reclaim space after deletes (run periodically after pruning).
    #[instrument(skip(self), fields(repo = "metrics", operation = "vacuum"))]
    pub async fn vacuum(&self) -> QueryResult<()> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }

    async fn fetch_all(&self, query: &BuiltQuery) -> QueryResult<Vec<SqliteRow>> {
        log_query(query);
        Ok(bind_all(query).fetch_all(&self.pool).await?)
    }
}

fn log_query(query: &BuiltQuery) {
    tracing::debug!(sql = %query.render_inline(), "store query");
}

fn bind_all(query: &BuiltQuery) -> sqlx::query::Query<'_, Sqlite, SqliteArguments<'_>> {
    let mut q = sqlx::query(&query.sql);
    for param in &query.params {
        q = match param {
            SqlValue::Text(s) => q.bind(s.as_str()),
            SqlValue::Int(i) => q.bind(*i),
        };
    }
    q
}

fn bucket_time(secs: i64) -> QueryResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| QueryError::Conversion(format!("bucket {secs} out of range")))
}
