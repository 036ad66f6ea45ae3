// Raw table, rollup tables and the insert triggers that feed them.
// Every raw insert appends one partial-state row per rollup table; reads merge them.

use sqlx::SqlitePool;

use crate::models::Resolution;
use crate::resolution;

pub(super) async fn init_schema(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS metrics_raw (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            ts INTEGER NOT NULL,
            host TEXT NOT NULL,
            vm TEXT NOT NULL,
            metric TEXT NOT NULL,
            value REAL NOT NULL,
            tags TEXT NOT NULL DEFAULT '{}'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_metrics_raw_ts ON metrics_raw(ts)")
        .execute(pool)
        .await?;

    for r in Resolution::ALL {
        for statement in rollup_ddl(r)? {
            sqlx::query(&statement).execute(pool).await?;
        }
    }

    Ok(())
}

/// Table, index and trigger for one resolution. Identifiers come from the resolver allow-list.
fn rollup_ddl(r: Resolution) -> anyhow::Result<[String; 3]> {
    let t = resolution::resolve(r)?;
    let (table, b, secs) = (t.table, t.bucket_column, r.bucket_seconds());
    Ok([
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                {b} INTEGER NOT NULL,
                host TEXT NOT NULL,
                vm TEXT NOT NULL,
                metric TEXT NOT NULL,
                sum_value REAL NOT NULL,
                cnt_value INTEGER NOT NULL,
                min_value REAL NOT NULL,
                max_value REAL NOT NULL
            )"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_metric_bucket ON {table}(metric, {b}, host, vm)"
        ),
        format!(
            "CREATE TRIGGER IF NOT EXISTS trg_{table}_partial AFTER INSERT ON metrics_raw
             BEGIN
                INSERT INTO {table} ({b}, host, vm, metric, sum_value, cnt_value, min_value, max_value)
                VALUES ((NEW.ts / {secs}) * {secs}, NEW.host, NEW.vm, NEW.metric, NEW.value, 1, NEW.value, NEW.value);
             END"
        ),
    ])
}
