//! Health, metrics, log buffer and tool catalog endpoints

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use super::AppState;
use crate::error::{GatewayError, Result};
use crate::logbuf::LogQuery;
use crate::metrics::encode_metrics;
use crate::tools::tool_definitions;

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Prometheus text exposition
pub async fn metrics() -> Result<impl IntoResponse> {
    let body = encode_metrics().map_err(|e| GatewayError::Internal(e.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> Json<Value> {
    let logs = state.logs.query(&query);
    Json(json!({
        "success": true,
        "count": logs.len(),
        "logs": logs,
    }))
}

pub async fn clear_logs(State(state): State<AppState>) -> Json<Value> {
    let cleared = state.logs.clear();
    tracing::info!(cleared, "Log buffer cleared");
    Json(json!({ "success": true, "cleared": cleared }))
}

pub async fn list_tools() -> Json<Value> {
    let tools = tool_definitions();
    Json(json!({
        "success": true,
        "count": tools.len(),
        "tools": tools,
    }))
}
