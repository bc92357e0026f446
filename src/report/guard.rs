// Existence check run right before aggregating an (endpoint, window) pair.

use std::sync::Arc;

use crate::error::EngineError;
use crate::models::Window;
use crate::store::ReportSink;

pub struct IdempotencyGuard<R> {
    sink: Arc<R>,
}

impl<R> Clone for IdempotencyGuard<R> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<R: ReportSink> IdempotencyGuard<R> {
    pub fn new(sink: Arc<R>) -> Self {
        Self { sink }
    }

    /// Exact match on (endpoint, window.start); windows are aligned so no overlap test is needed.
    /// Read-only, safe to repeat.
    pub async fn already_processed(&self, endpoint: &str, window: Window) -> Result<bool, EngineError> {
        self.sink
            .exists(endpoint, window.start)
            .await
            .map_err(|source| EngineError::SinkQueryFailed {
                endpoint: endpoint.to_string(),
                window_start: window.start,
                source,
            })
    }
}
