// Resolution -> (rollup table, bucket column). The only source of structural SQL identifiers.

use crate::error::{QueryError, QueryResult};
use crate::models::Resolution;

/// A rollup table together with the column holding its bucket start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RollupTarget {
    pub table: &'static str,
    pub bucket_column: &'static str,
}

/// Every (table, bucket column) pair allowed to appear in generated SQL.
pub const ALLOWED_TARGETS: [RollupTarget; 3] = [
    RollupTarget {
        table: "metrics_1m",
        bucket_column: "minute",
    },
    RollupTarget {
        table: "metrics_5m",
        bucket_column: "bucket",
    },
    RollupTarget {
        table: "metrics_1h",
        bucket_column: "bucket",
    },
];

fn mapping(resolution: Resolution) -> RollupTarget {
    match resolution {
        Resolution::OneMinute => ALLOWED_TARGETS[0],
        Resolution::FiveMinutes => ALLOWED_TARGETS[1],
        Resolution::OneHour => ALLOWED_TARGETS[2],
    }
}

/// Resolve to the rollup target, refusing any pair outside `ALLOWED_TARGETS`.
pub fn resolve(resolution: Resolution) -> QueryResult<RollupTarget> {
    check_allowed(mapping(resolution))
}

/// Parse a wire resolution and resolve it in one step.
pub fn resolve_str(resolution: &str) -> QueryResult<RollupTarget> {
    resolve(resolution.parse()?)
}

fn check_allowed(target: RollupTarget) -> QueryResult<RollupTarget> {
    if ALLOWED_TARGETS.contains(&target) {
        Ok(target)
    } else {
        Err(QueryError::InvalidResolution(format!(
            "{}.{} is not an allowed rollup target",
            target.table, target.bucket_column
        )))
    }
}
