// Merge-aware read queries over the rollup tables.
// Literal values (metric, host, vm, timestamps, limit) are bound as `?` parameters.
// Table and bucket column names only ever come from a resolved RollupTarget.

use chrono::{DateTime, Utc};

use crate::models::{CardinalityKind, RankScope, Target, TimeWindow};
use crate::resolution::RollupTarget;

/// Merged average/min/max over the partial-state columns of a rollup table.
const MERGED_STATS: &str = "SUM(sum_value) / SUM(cnt_value) AS avg, \
     MIN(min_value) AS min, MAX(max_value) AS max";

/// A bound query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
}

/// SQL text with positional `?` placeholders and the values to bind, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl BuiltQuery {
    /// SQL with every placeholder replaced by its quoted literal. Used for debug logging only.
    pub fn render_inline(&self) -> String {
        let mut out = String::with_capacity(self.sql.len() + 16 * self.params.len());
        let mut params = self.params.iter();
        for c in self.sql.chars() {
            if c == '?' {
                match params.next() {
                    Some(SqlValue::Text(s)) => out.push_str(&quote_literal(s)),
                    Some(SqlValue::Int(i)) => out.push_str(&i.to_string()),
                    None => out.push(c),
                }
            } else {
                out.push(c);
            }
        }
        out
    }
}

/// Quote a string as an SQLite literal: wrap in single quotes, double embedded quotes.
pub fn quote_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\'' {
            out.push('\'');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

fn unix(ts: DateTime<Utc>) -> SqlValue {
    SqlValue::Int(ts.timestamp())
}

/// WHERE-clause accumulator.
#[derive(Debug, Default, Clone)]
struct Filter {
    clauses: Vec<String>,
    params: Vec<SqlValue>,
}

impl Filter {
    fn eq(&mut self, column: &'static str, value: &str) {
        self.clauses.push(format!("{column} = ?"));
        self.params.push(SqlValue::Text(value.to_string()));
    }

    fn window(&mut self, column: &'static str, window: &TimeWindow) {
        self.clauses.push(format!("{column} >= ? AND {column} <= ?"));
        self.params.push(unix(window.from));
        self.params.push(unix(window.to));
    }

    fn target(&mut self, target: &Target) {
        if let Some(host) = target.host() {
            self.eq("host", host);
        }
        if let Some(vm) = target.vm() {
            self.eq("vm", vm);
        }
    }

    fn sql(&self) -> String {
        if self.clauses.is_empty() {
            "1 = 1".to_string()
        } else {
            self.clauses.join(" AND ")
        }
    }
}

/// Select expressions for host/vm (NULL when the scope does not carry them) and extra GROUP BY columns.
fn identity_columns(target: &Target) -> (&'static str, &'static str, &'static str) {
    match target {
        Target::Global => ("NULL", "NULL", ""),
        Target::Host { .. } => ("host", "NULL", ", host"),
        Target::Vm { .. } => ("host", "vm", ", host, vm"),
    }
}

/// Per-bucket merged stats in `[from, to]`, ascending by bucket.
pub fn range(t: RollupTarget, metric: &str, target: &Target, window: &TimeWindow) -> BuiltQuery {
    let b = t.bucket_column;
    let mut filter = Filter::default();
    filter.eq("metric", metric);
    filter.window(b, window);
    filter.target(target);
    let (host_sel, vm_sel, group_extra) = identity_columns(target);
    let sql = format!(
        "SELECT {b} AS bucket, {host_sel} AS host, {vm_sel} AS vm, {MERGED_STATS} \
         FROM {table} WHERE {where_} \
         GROUP BY {b}{group_extra} ORDER BY {b} ASC",
        table = t.table,
        where_ = filter.sql(),
    );
    BuiltQuery {
        sql,
        params: filter.params,
    }
}

/// Merged stats at the latest bucket matching the same filters. Zero or one row.
pub fn latest(t: RollupTarget, metric: &str, target: &Target) -> BuiltQuery {
    let b = t.bucket_column;
    let mut filter = Filter::default();
    filter.eq("metric", metric);
    filter.target(target);
    let (host_sel, vm_sel, group_extra) = identity_columns(target);
    let where_ = filter.sql();
    let sql = format!(
        "SELECT {b} AS bucket, {host_sel} AS host, {vm_sel} AS vm, {MERGED_STATS} \
         FROM {table} WHERE {where_} \
         AND {b} = (SELECT MAX({b}) FROM {table} WHERE {where_}) \
         GROUP BY {b}{group_extra}",
        table = t.table,
    );
    let mut params = filter.params.clone();
    params.extend(filter.params);
    BuiltQuery { sql, params }
}

/// Ranking direction for top/bottom queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankOrder {
    Top,
    Bottom,
}

/// Entities by merged average at the latest bucket, `limit` rows at most.
pub fn rank(t: RollupTarget, metric: &str, scope: &RankScope, order: RankOrder, limit: u32) -> BuiltQuery {
    let b = t.bucket_column;
    let mut filter = Filter::default();
    filter.eq("metric", metric);
    if let Some(host) = scope.host() {
        filter.eq("host", host);
    }
    let (vm_sel, group_cols, tie_break) = match scope {
        RankScope::Host => ("NULL", "host", "host ASC"),
        RankScope::Vm { .. } => ("vm", "host, vm", "host ASC, vm ASC"),
    };
    let dir = match order {
        RankOrder::Top => "DESC",
        RankOrder::Bottom => "ASC",
    };
    let where_ = filter.sql();
    let sql = format!(
        "SELECT host, {vm_sel} AS vm, SUM(sum_value) / SUM(cnt_value) AS value \
         FROM {table} WHERE {where_} \
         AND {b} = (SELECT MAX({b}) FROM {table} WHERE {where_}) \
         GROUP BY {group_cols} ORDER BY value {dir}, {tie_break} LIMIT ?",
        table = t.table,
    );
    let mut params = filter.params.clone();
    params.extend(filter.params);
    params.push(SqlValue::Int(i64::from(limit)));
    BuiltQuery { sql, params }
}

/// Merged average per (metric, host, vm) for the given metrics over one window.
pub fn extremes(t: RollupTarget, metrics: &[&str], window: &TimeWindow) -> BuiltQuery {
    let b = t.bucket_column;
    let placeholders = vec!["?"; metrics.len()].join(", ");
    let mut params: Vec<SqlValue> = metrics
        .iter()
        .map(|m| SqlValue::Text((*m).to_string()))
        .collect();
    let mut filter = Filter::default();
    filter.window(b, window);
    params.extend(filter.params.clone());
    let sql = format!(
        "SELECT metric, host, vm, SUM(sum_value) / SUM(cnt_value) AS value \
         FROM {table} WHERE metric IN ({placeholders}) AND {where_} \
         GROUP BY metric, host, vm ORDER BY metric, host, vm",
        table = t.table,
        where_ = filter.sql(),
    );
    BuiltQuery { sql, params }
}

/// Distinct hosts, (host, vm) pairs or metrics in the window, or at the latest bucket.
pub fn cardinality(t: RollupTarget, kind: CardinalityKind, window: Option<&TimeWindow>) -> BuiltQuery {
    let b = t.bucket_column;
    let cols = match kind {
        CardinalityKind::Vm => "host, vm",
        CardinalityKind::Host => "host",
        CardinalityKind::Metric => "metric",
    };
    let (where_, params) = match window {
        Some(window) => {
            let mut filter = Filter::default();
            filter.window(b, window);
            (filter.sql(), filter.params)
        }
        None => (
            format!("{b} = (SELECT MAX({b}) FROM {table})", table = t.table),
            Vec::new(),
        ),
    };
    let sql = format!(
        "SELECT COUNT(*) AS value FROM (SELECT DISTINCT {cols} FROM {table} WHERE {where_})",
        table = t.table,
    );
    BuiltQuery { sql, params }
}

/// Merged stats over one window without bucket grouping; `samples` is 0 when the window is empty.
pub fn window_stats(t: RollupTarget, metric: &str, target: &Target, window: &TimeWindow) -> BuiltQuery {
    let mut filter = Filter::default();
    filter.eq("metric", metric);
    filter.target(target);
    filter.window(t.bucket_column, window);
    let sql = format!(
        "SELECT {MERGED_STATS}, COALESCE(SUM(cnt_value), 0) AS samples \
         FROM {table} WHERE {where_}",
        table = t.table,
        where_ = filter.sql(),
    );
    BuiltQuery {
        sql,
        params: filter.params,
    }
}
