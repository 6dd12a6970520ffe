use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router};
use serde_json::json;

use emission_core::activity::{
    ActivityRecord, ActivityRecordId, InMemoryActivitySource, MetricDefinition,
};
use emission_core::calculation::{calculation_router, CalculationError};
use emission_core::error::AppError;

use crate::infra::{AppState, MemoryService};

pub(crate) fn with_service_routes(
    service: Arc<MemoryService>,
    sources: Arc<InMemoryActivitySource>,
) -> Router {
    calculation_router(service)
        .merge(activity_routes(sources))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

/// Intake for the in-memory activity feed, standing in for the submission system.
fn activity_routes(sources: Arc<InMemoryActivitySource>) -> Router {
    Router::new()
        .route("/api/v1/activity/metrics", post(put_metric_endpoint))
        .route("/api/v1/activity/records", post(put_record_endpoint))
        .route(
            "/api/v1/activity/records/:record_id",
            delete(remove_record_endpoint),
        )
        .with_state(sources)
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    if state.readiness.load(Ordering::Acquire) {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "initializing" })),
        )
    }
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn put_metric_endpoint(
    State(sources): State<Arc<InMemoryActivitySource>>,
    Json(metric): Json<MetricDefinition>,
) -> Result<StatusCode, AppError> {
    sources.put_metric(metric).map_err(CalculationError::from)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn put_record_endpoint(
    State(sources): State<Arc<InMemoryActivitySource>>,
    Json(record): Json<ActivityRecord>,
) -> Result<StatusCode, AppError> {
    sources.put_record(record).map_err(CalculationError::from)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn remove_record_endpoint(
    State(sources): State<Arc<InMemoryActivitySource>>,
    Path(record_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let removed = sources
        .remove_record(&ActivityRecordId(record_id))
        .map_err(CalculationError::from)?;
    Ok(if removed.is_some() {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    })
}
