// Domain models: ingested points, validated query shapes, analytic results.

mod metric;
mod params;
mod query;
mod result;

pub use metric::{MetricPoint, RawSeriesRow};
pub use params::{
    CardinalityParams, CompareParams, ExtremesParams, LatestParams, RangeParams, RankParams,
    TrendParams,
};
pub use query::{
    CardinalityKind, CardinalityQuery, CompareQuery, ExtremesQuery, LatestQuery, Limit,
    RangeQuery, RankQuery, RankScope, Resolution, Scope, Target, TimeWindow, TrendQuery,
};
pub use result::{
    AggregateRow, CardinalityResult, CompareResult, ExtremeEntry, ExtremesResult, LatestResult,
    RankedEntity, Stats, Status, TrendResult,
};
