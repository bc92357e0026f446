// HTTP routes: liveness, version, scheduler status, stored reports

mod http;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::scheduler::SchedulerHandle;
use crate::store::SqliteStore;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) scheduler: SchedulerHandle,
    pub(crate) store: Arc<SqliteStore>,
    pub(crate) config: AppConfig,
}

pub fn app(scheduler: SchedulerHandle, store: Arc<SqliteStore>, config: AppConfig) -> Router {
    let state = AppState {
        scheduler,
        store,
        config,
    };
    Router::new()
        .route("/", get(|| async { "probe-report is running" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/status", get(http::status_handler)) // GET /api/status
        .route("/api/reports", get(http::reports_handler)) // GET /api/reports
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
