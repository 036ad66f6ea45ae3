// Service handlers: version, ingest

use axum::{Json, extract::State, response::IntoResponse};

use super::AppState;
use super::extract::ApiJson;
use crate::error::QueryError;
use crate::models::MetricPoint;
use crate::version::BUILD;

/// GET /version: service name and version.
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(BUILD)
}

/// POST /metrics: one ingestion timestamp for the whole batch, no per-row status.
pub(super) async fn ingest_handler(
    State(state): State<AppState>,
    ApiJson(batch): ApiJson<Vec<MetricPoint>>,
) -> Result<impl IntoResponse, QueryError> {
    state.writer.ingest(batch).await?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}
