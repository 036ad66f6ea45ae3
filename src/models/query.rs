// Validated query shapes. Constructing one of these is the validation step:
// anything that reaches the store has already passed scope, window and limit checks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{QueryError, QueryResult};

/// Entity-identity dimension a query filters and groups by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Vm,
    Host,
    Global,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vm => "vm",
            Self::Host => "host",
            Self::Global => "global",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vm" => Ok(Self::Vm),
            "host" => Ok(Self::Host),
            "global" => Ok(Self::Global),
            other => Err(QueryError::InvalidScope(format!("unknown scope '{other}'"))),
        }
    }
}

/// Rollup resolution. Each variant is bound to exactly one rollup table (see `resolution::resolve`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "1h")]
    OneHour,
}

impl Resolution {
    pub const ALL: [Resolution; 3] = [Self::OneMinute, Self::FiveMinutes, Self::OneHour];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::OneHour => "1h",
        }
    }

    pub fn bucket_seconds(&self) -> i64 {
        match self {
            Self::OneMinute => 60,
            Self::FiveMinutes => 300,
            Self::OneHour => 3600,
        }
    }

    /// Parse an optional wire value; absent means the finest resolution.
    pub fn parse_or_default(value: Option<&str>) -> QueryResult<Self> {
        value.map_or(Ok(Self::default()), str::parse)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Self::OneMinute),
            "5m" => Ok(Self::FiveMinutes),
            "1h" => Ok(Self::OneHour),
            other => Err(QueryError::InvalidResolution(other.to_string())),
        }
    }
}

/// Scope with its identity columns: `vm` needs host and vm, `host` needs host only, `global` neither.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    Global,
    Host { host: String },
    Vm { host: String, vm: String },
}

impl Target {
    pub fn new(scope: Scope, host: Option<String>, vm: Option<String>) -> QueryResult<Self> {
        match (scope, host, vm) {
            (Scope::Global, None, None) => Ok(Self::Global),
            (Scope::Host, Some(host), None) => Ok(Self::Host { host }),
            (Scope::Vm, Some(host), Some(vm)) => Ok(Self::Vm { host, vm }),
            (Scope::Global, _, _) => Err(QueryError::InvalidScope(
                "scope 'global' takes neither host nor vm".into(),
            )),
            (Scope::Host, None, _) => {
                Err(QueryError::InvalidScope("scope 'host' requires host".into()))
            }
            (Scope::Host, Some(_), Some(_)) => {
                Err(QueryError::InvalidScope("scope 'host' does not take vm".into()))
            }
            (Scope::Vm, _, _) => Err(QueryError::InvalidScope(
                "scope 'vm' requires both host and vm".into(),
            )),
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            Self::Global => Scope::Global,
            Self::Host { .. } => Scope::Host,
            Self::Vm { .. } => Scope::Vm,
        }
    }

    pub fn host(&self) -> Option<&str> {
        match self {
            Self::Global => None,
            Self::Host { host } | Self::Vm { host, .. } => Some(host),
        }
    }

    pub fn vm(&self) -> Option<&str> {
        match self {
            Self::Vm { vm, .. } => Some(vm),
            _ => None,
        }
    }
}

/// Entities ranked by top/bottom queries: hosts, or (host, vm) pairs optionally within one host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RankScope {
    Host,
    Vm { host: Option<String> },
}

impl RankScope {
    pub fn new(scope: Scope, host: Option<String>, vm: Option<String>) -> QueryResult<Self> {
        if vm.is_some() {
            return Err(QueryError::InvalidScope(
                "ranking queries do not take vm".into(),
            ));
        }
        match (scope, host) {
            (Scope::Host, None) => Ok(Self::Host),
            (Scope::Host, Some(_)) => Err(QueryError::InvalidScope(
                "scope 'host' ranks all hosts and does not take host".into(),
            )),
            (Scope::Vm, host) => Ok(Self::Vm { host }),
            (Scope::Global, _) => Err(QueryError::InvalidScope(
                "ranking requires scope 'host' or 'vm'".into(),
            )),
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            Self::Host => Scope::Host,
            Self::Vm { .. } => Scope::Vm,
        }
    }

    pub fn host(&self) -> Option<&str> {
        match self {
            Self::Vm { host } => host.as_deref(),
            Self::Host => None,
        }
    }
}

/// Inclusive `[from, to]` time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> QueryResult<Self> {
        if from > to {
            return Err(QueryError::InvalidWindow(format!(
                "from ({}) is after to ({})",
                from.to_rfc3339(),
                to.to_rfc3339()
            )));
        }
        Ok(Self { from, to })
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.from <= other.to && other.from <= self.to
    }
}

/// Caller-requested result size; always positive. The server cap is applied by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Limit(u32);

impl Limit {
    pub fn new(requested: i64) -> QueryResult<Self> {
        if requested <= 0 {
            return Err(QueryError::InvalidLimit(requested));
        }
        Ok(Self(u32::try_from(requested).unwrap_or(u32::MAX)))
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    pub fn clamped(&self, max: u32) -> u32 {
        self.0.min(max)
    }
}

/// What a cardinality query counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardinalityKind {
    Vm,
    Host,
    Metric,
}

impl CardinalityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vm => "vm",
            Self::Host => "host",
            Self::Metric => "metric",
        }
    }
}

impl FromStr for CardinalityKind {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vm" => Ok(Self::Vm),
            "host" => Ok(Self::Host),
            "metric" => Ok(Self::Metric),
            other => Err(QueryError::InvalidScope(format!(
                "cardinality counts vm, host or metric, got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeQuery {
    pub metric: String,
    pub target: Target,
    pub window: TimeWindow,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatestQuery {
    pub metric: String,
    pub target: Target,
    pub resolution: Resolution,
}

/// Top-N or bottom-N request.
#[derive(Debug, Clone, PartialEq)]
pub struct RankQuery {
    pub metric: String,
    pub scope: RankScope,
    pub limit: Limit,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtremesQuery {
    pub window: TimeWindow,
    pub limit: Limit,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardinalityQuery {
    pub kind: CardinalityKind,
    /// None restricts the count to the latest bucket.
    pub window: Option<TimeWindow>,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompareQuery {
    pub metric: String,
    pub target: Target,
    pub before: TimeWindow,
    pub after: TimeWindow,
    pub resolution: Resolution,
}

impl CompareQuery {
    pub fn new(
        metric: String,
        target: Target,
        before: TimeWindow,
        after: TimeWindow,
        resolution: Resolution,
    ) -> QueryResult<Self> {
        if before.overlaps(&after) {
            return Err(QueryError::InvalidWindow(
                "compare windows must be disjoint".into(),
            ));
        }
        Ok(Self {
            metric,
            target,
            before,
            after,
            resolution,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendQuery {
    pub metric: String,
    pub target: Target,
    pub window: TimeWindow,
    pub resolution: Resolution,
}
