// GET /metrics/* analytic queries. Params are validated into typed queries before the reader runs.

use axum::{Json, extract::State};

use super::AppState;
use super::extract::ApiQuery;
use crate::error::QueryError;
use crate::models::{
    AggregateRow, CardinalityParams, CardinalityQuery, CardinalityResult, CompareParams,
    CompareQuery, CompareResult, ExtremesParams, ExtremesQuery, ExtremesResult, LatestParams,
    LatestQuery, LatestResult, RangeParams, RangeQuery, RankParams, RankQuery, RankedEntity,
    TrendParams, TrendQuery, TrendResult,
};

type ApiResult<T> = Result<Json<T>, QueryError>;

pub(super) async fn range_handler(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<RangeParams>,
) -> ApiResult<Vec<AggregateRow>> {
    let query = RangeQuery::try_from(params)?;
    Ok(Json(state.reader.range(&query).await?))
}

pub(super) async fn latest_handler(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<LatestParams>,
) -> ApiResult<LatestResult> {
    let query = LatestQuery::try_from(params)?;
    Ok(Json(state.reader.latest(&query).await?))
}

pub(super) async fn top_handler(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<RankParams>,
) -> ApiResult<Vec<RankedEntity>> {
    let query = RankQuery::try_from(params)?;
    Ok(Json(state.reader.top(&query).await?))
}

pub(super) async fn bottom_handler(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<RankParams>,
) -> ApiResult<Vec<RankedEntity>> {
    let query = RankQuery::try_from(params)?;
    Ok(Json(state.reader.bottom(&query).await?))
}

pub(super) async fn extremes_handler(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ExtremesParams>,
) -> ApiResult<ExtremesResult> {
    let query = ExtremesQuery::try_from(params)?;
    Ok(Json(state.reader.extremes(&query).await?))
}

pub(super) async fn cardinality_handler(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<CardinalityParams>,
) -> ApiResult<CardinalityResult> {
    let query = CardinalityQuery::try_from(params)?;
    Ok(Json(state.reader.cardinality(&query).await?))
}

pub(super) async fn compare_handler(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<CompareParams>,
) -> ApiResult<CompareResult> {
    let query = CompareQuery::try_from(params)?;
    Ok(Json(state.reader.compare(&query).await?))
}

pub(super) async fn trend_handler(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<TrendParams>,
) -> ApiResult<TrendResult> {
    let query = TrendQuery::try_from(params)?;
    Ok(Json(state.reader.trend(&query).await?))
}
