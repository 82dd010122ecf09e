//! Lookup API handlers.

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::warn;

use super::ApiState;
use crate::lookup::{LookupRequest, RegistryLookup, SearchLookup};

fn json_error(code: &str, msg: impl std::fmt::Display) -> Json<Value> {
    Json(json!({ "error": code, "message": format!("{msg}") }))
}

/// Parsed lookup parameters, or the 400 to answer with.
fn lookup_request(query: Result<Query<LookupRequest>, QueryRejection>) -> Result<LookupRequest, Response> {
    let Query(req) = query
        .map_err(|e| (StatusCode::BAD_REQUEST, json_error("invalid_parameters", e.body_text())).into_response())?;
    if req.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            json_error("missing_parameters", "provide at least one of: name, registry_id"),
        )
            .into_response());
    }
    Ok(req)
}

/// GET /health
pub(super) async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /lookup — the consolidated record, always 200 once the request is valid.
pub(super) async fn lookup<R, S>(
    State(state): State<ApiState<R, S>>,
    query: Result<Query<LookupRequest>, QueryRejection>,
) -> Response
where
    R: RegistryLookup + 'static,
    S: SearchLookup + 'static,
{
    let req = match lookup_request(query) {
        Ok(req) => req,
        Err(response) => return response,
    };
    let record = state.aggregator.aggregate(&req).await;
    (StatusCode::OK, Json(record)).into_response()
}

/// GET /report — aggregate, then hand the record to the rendering collaborator.
///
/// Only a dispatch failure changes the status code; lookup failures are
/// already data inside the record.
pub(super) async fn report<R, S>(
    State(state): State<ApiState<R, S>>,
    query: Result<Query<LookupRequest>, QueryRejection>,
) -> Response
where
    R: RegistryLookup + 'static,
    S: SearchLookup + 'static,
{
    let req = match lookup_request(query) {
        Ok(req) => req,
        Err(response) => return response,
    };
    let record = state.aggregator.aggregate(&req).await;
    let report = state.dispatcher.dispatch_report(&record).await;
    if report.is_dispatch_failure() {
        warn!("report dispatch failed");
        return (StatusCode::BAD_GATEWAY, Json(report)).into_response();
    }
    (StatusCode::OK, Json(report)).into_response()
}
