// HTTP routes: ingest, analytic queries, version

mod extract;
mod http;
mod query;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::ingest::IngestWriter;
use crate::reader::MetricsReader;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) reader: Arc<dyn MetricsReader>,
    pub(crate) writer: Arc<IngestWriter>,
}

pub fn app(reader: Arc<dyn MetricsReader>, writer: Arc<IngestWriter>) -> Router {
    let state = AppState { reader, writer };
    Router::new()
        .route("/", get(|| async { "hostmetrics: up" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/metrics", post(http::ingest_handler)) // POST /metrics
        .route("/metrics/range", get(query::range_handler))
        .route("/metrics/latest", get(query::latest_handler))
        .route("/metrics/top", get(query::top_handler))
        .route("/metrics/bottom", get(query::bottom_handler))
        .route("/metrics/extremes", get(query::extremes_handler))
        .route("/metrics/cardinality", get(query::cardinality_handler))
        .route("/metrics/compare", get(query::compare_handler))
        .route("/metrics/trend", get(query::trend_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
