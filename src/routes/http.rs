// GET handlers: version, scheduler status, stored reports

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use super::AppState;
use crate::version::{NAME, REPORT_SCHEMA_VERSION, VERSION};

const DEFAULT_REPORT_LIMIT: u32 = 500;
const MAX_REPORT_LIMIT: u32 = 5000;

/// GET /version: service name, version and report schema version.
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
        "schemaVersion": REPORT_SCHEMA_VERSION,
    }))
}

/// GET /api/status: scheduler state, cursor and counters, plus the configured endpoints.
pub(super) async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.scheduler.status();
    axum::Json(serde_json::json!({
        "scheduler": status,
        "endpoints": state.config.report.endpoints,
        "periodSecs": state.config.report.period_secs,
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct ReportsQuery {
    endpoint: Option<String>,
    /// Window start lower bound, unix seconds (inclusive).
    from: Option<i64>,
    /// Window start upper bound, unix seconds (exclusive).
    to: Option<i64>,
    limit: Option<u32>,
}

/// GET /api/reports?endpoint=&from=&to=&limit=: stored reports, ascending by window.
pub(super) async fn reports_handler(
    State(state): State<AppState>,
    Query(q): Query<ReportsQuery>,
) -> axum::response::Response {
    let from = q.from.unwrap_or(i64::MIN);
    let to = q.to.unwrap_or(i64::MAX);
    if from >= to {
        return (
            StatusCode::BAD_REQUEST,
            axum::Json(serde_json::json!({ "error": "from must be less than to" })),
        )
            .into_response();
    }
    let limit = q.limit.unwrap_or(DEFAULT_REPORT_LIMIT).min(MAX_REPORT_LIMIT);

    match state
        .store
        .list_reports(q.endpoint.as_deref(), from, to, limit)
        .await
    {
        Ok(reports) => axum::Json(reports).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, operation = "list_reports", "report query failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(serde_json::json!({ "error": "report query failed" })),
            )
                .into_response()
        }
    }
}
