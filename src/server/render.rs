//! Render service handler.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::warn;

use crate::render::{ReportRenderer, has_data};

/// POST /render — any JSON body; answers `{document}` or `{error}`.
pub(super) async fn render(State(renderer): State<Arc<ReportRenderer>>, body: Bytes) -> Response {
    let data = serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null);
    if !has_data(&data) {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "no data provided" }))).into_response();
    }

    match renderer.render(&data).await {
        Ok(document) => Json(json!({ "document": document })).into_response(),
        Err(e) => {
            warn!(provider = renderer.provider_name(), "report generation failed: {e}");
            Json(json!({ "error": format!("report generation failed: {e}") })).into_response()
        }
    }
}
