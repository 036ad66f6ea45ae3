// Query-string shapes as received over HTTP, and their conversion into validated queries.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::query::{
    CardinalityKind, CardinalityQuery, CompareQuery, ExtremesQuery, LatestQuery, Limit,
    RangeQuery, RankQuery, RankScope, Resolution, Scope, Target, TimeWindow, TrendQuery,
};
use crate::error::{QueryError, QueryResult};

#[derive(Debug, Clone, Deserialize)]
pub struct RangeParams {
    pub metric: String,
    pub scope: String,
    pub host: Option<String>,
    pub vm: Option<String>,
    pub from_ts: DateTime<Utc>,
    pub to_ts: DateTime<Utc>,
    pub resolution: Option<String>,
}

impl TryFrom<RangeParams> for RangeQuery {
    type Error = QueryError;

    fn try_from(p: RangeParams) -> QueryResult<Self> {
        Ok(Self {
            target: Target::new(p.scope.parse()?, p.host, p.vm)?,
            window: TimeWindow::new(p.from_ts, p.to_ts)?,
            resolution: Resolution::parse_or_default(p.resolution.as_deref())?,
            metric: p.metric,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LatestParams {
    pub metric: String,
    pub scope: String,
    pub host: Option<String>,
    pub vm: Option<String>,
    pub resolution: Option<String>,
}

impl TryFrom<LatestParams> for LatestQuery {
    type Error = QueryError;

    fn try_from(p: LatestParams) -> QueryResult<Self> {
        Ok(Self {
            target: Target::new(p.scope.parse()?, p.host, p.vm)?,
            resolution: Resolution::parse_or_default(p.resolution.as_deref())?,
            metric: p.metric,
        })
    }
}

/// Shared by top and bottom.
#[derive(Debug, Clone, Deserialize)]
pub struct RankParams {
    pub metric: String,
    pub scope: String,
    pub host: Option<String>,
    pub vm: Option<String>,
    pub limit: i64,
    pub resolution: Option<String>,
}

impl TryFrom<RankParams> for RankQuery {
    type Error = QueryError;

    fn try_from(p: RankParams) -> QueryResult<Self> {
        let scope: Scope = p.scope.parse()?;
        Ok(Self {
            scope: RankScope::new(scope, p.host, p.vm)?,
            limit: Limit::new(p.limit)?,
            resolution: Resolution::parse_or_default(p.resolution.as_deref())?,
            metric: p.metric,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtremesParams {
    pub from_ts: DateTime<Utc>,
    pub to_ts: DateTime<Utc>,
    pub limit: i64,
    pub resolution: Option<String>,
}

impl TryFrom<ExtremesParams> for ExtremesQuery {
    type Error = QueryError;

    fn try_from(p: ExtremesParams) -> QueryResult<Self> {
        Ok(Self {
            window: TimeWindow::new(p.from_ts, p.to_ts)?,
            limit: Limit::new(p.limit)?,
            resolution: Resolution::parse_or_default(p.resolution.as_deref())?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardinalityParams {
    pub scope: String,
    pub from_ts: Option<DateTime<Utc>>,
    pub to_ts: Option<DateTime<Utc>>,
    pub resolution: Option<String>,
}

impl TryFrom<CardinalityParams> for CardinalityQuery {
    type Error = QueryError;

    fn try_from(p: CardinalityParams) -> QueryResult<Self> {
        let window = match (p.from_ts, p.to_ts) {
            (Some(from), Some(to)) => Some(TimeWindow::new(from, to)?),
            (None, None) => None,
            _ => {
                return Err(QueryError::InvalidWindow(
                    "from_ts and to_ts must be given together".into(),
                ));
            }
        };
        Ok(Self {
            kind: p.scope.parse::<CardinalityKind>()?,
            window,
            resolution: Resolution::parse_or_default(p.resolution.as_deref())?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompareParams {
    pub metric: String,
    pub scope: String,
    pub host: Option<String>,
    pub vm: Option<String>,
    pub from_a: DateTime<Utc>,
    pub to_a: DateTime<Utc>,
    pub from_b: DateTime<Utc>,
    pub to_b: DateTime<Utc>,
    pub resolution: Option<String>,
}

impl TryFrom<CompareParams> for CompareQuery {
    type Error = QueryError;

    fn try_from(p: CompareParams) -> QueryResult<Self> {
        let target = Target::new(p.scope.parse()?, p.host, p.vm)?;
        let before = TimeWindow::new(p.from_a, p.to_a)?;
        let after = TimeWindow::new(p.from_b, p.to_b)?;
        let resolution = Resolution::parse_or_default(p.resolution.as_deref())?;
        CompareQuery::new(p.metric, target, before, after, resolution)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrendParams {
    pub metric: String,
    pub scope: String,
    pub host: Option<String>,
    pub vm: Option<String>,
    pub from_ts: DateTime<Utc>,
    pub to_ts: DateTime<Utc>,
    pub resolution: Option<String>,
}

impl TryFrom<TrendParams> for TrendQuery {
    type Error = QueryError;

    fn try_from(p: TrendParams) -> QueryResult<Self> {
        Ok(Self {
            target: Target::new(p.scope.parse()?, p.host, p.vm)?,
            window: TimeWindow::new(p.from_ts, p.to_ts)?,
            resolution: Resolution::parse_or_default(p.resolution.as_deref())?,
            metric: p.metric,
        })
    }
}
