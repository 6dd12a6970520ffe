use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::report::EmissionSummary;
use super::service::{CalculationError, EmissionCalculationService};
use super::store::{ResultFilter, ResultStore};
use crate::activity::{ActivityFeed, ActivityRecordId, AssignmentId, LayerId, MetricCatalog};
use crate::factors::{FactorQuery, FactorRepository};

/// Router builder exposing the calculation triggers and result queries.
pub fn calculation_router<A, F, S>(service: Arc<EmissionCalculationService<A, F, S>>) -> Router
where
    A: ActivityFeed + MetricCatalog + 'static,
    F: FactorRepository + 'static,
    S: ResultStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/calculations/records/:record_id",
            post(record_handler::<A, F, S>),
        )
        .route(
            "/api/v1/calculations/assignments/:assignment_id",
            post(assignment_handler::<A, F, S>),
        )
        .route(
            "/api/v1/calculations/recalculate",
            post(recalculate_handler::<A, F, S>),
        )
        .route("/api/v1/emissions", get(emissions_handler::<A, F, S>))
        .route("/api/v1/factors/lookup", post(factor_lookup_handler::<A, F, S>))
        .with_state(service)
}

pub(crate) async fn record_handler<A, F, S>(
    State(service): State<Arc<EmissionCalculationService<A, F, S>>>,
    Path(record_id): Path<String>,
) -> Response
where
    A: ActivityFeed + MetricCatalog + 'static,
    F: FactorRepository + 'static,
    S: ResultStore + 'static,
{
    match service.calculate_for_record(&ActivityRecordId(record_id)) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn assignment_handler<A, F, S>(
    State(service): State<Arc<EmissionCalculationService<A, F, S>>>,
    Path(assignment_id): Path<String>,
) -> Response
where
    A: ActivityFeed + MetricCatalog + 'static,
    F: FactorRepository + 'static,
    S: ResultStore + 'static,
{
    match service.calculate_for_assignment(&AssignmentId(assignment_id)) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn recalculate_handler<A, F, S>(
    State(service): State<Arc<EmissionCalculationService<A, F, S>>>,
) -> Response
where
    A: ActivityFeed + MetricCatalog + 'static,
    F: FactorRepository + 'static,
    S: ResultStore + 'static,
{
    match service.recalculate_all() {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

/// Query string accepted by the emissions listing.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct EmissionsParams {
    assignment_id: Option<String>,
    layer_id: Option<String>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

pub(crate) async fn emissions_handler<A, F, S>(
    State(service): State<Arc<EmissionCalculationService<A, F, S>>>,
    Query(params): Query<EmissionsParams>,
) -> Response
where
    A: ActivityFeed + MetricCatalog + 'static,
    F: FactorRepository + 'static,
    S: ResultStore + 'static,
{
    let filter = ResultFilter {
        assignment_id: params.assignment_id.map(AssignmentId),
        layer_id: params.layer_id.map(LayerId),
        from: params.from,
        to: params.to,
    };
    let results = match service.results(&filter) {
        Ok(results) => results,
        Err(err) => return error_response(err),
    };
    let summary = EmissionSummary::from_results(&results);
    let payload = json!({
        "results": results,
        "summary": summary,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn factor_lookup_handler<A, F, S>(
    State(service): State<Arc<EmissionCalculationService<A, F, S>>>,
    axum::Json(query): axum::Json<FactorQuery>,
) -> Response
where
    A: ActivityFeed + MetricCatalog + 'static,
    F: FactorRepository + 'static,
    S: ResultStore + 'static,
{
    match service.lookup_factor(&query) {
        Ok(Some(found)) => (StatusCode::OK, axum::Json(found)).into_response(),
        Ok(None) => {
            let payload = json!({
                "error": "no emission factor matches the query",
                "query": query,
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

fn error_response(err: CalculationError) -> Response {
    let status = if err.is_conflict() {
        StatusCode::CONFLICT
    } else if matches!(err, CalculationError::RecordNotFound(_)) {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = match &err {
        CalculationError::Aborted { partial, .. } => json!({
            "error": err.to_string(),
            "partial": partial,
        }),
        _ => json!({ "error": err.to_string() }),
    };
    (status, axum::Json(payload)).into_response()
}
