// Error taxonomy for the collaborators (StoreError) and the engine (EngineError).

use thiserror::Error;

/// Failure reported by a Sample Source or Report Sink.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A report for this (endpoint, window_start) is already stored.
    #[error("report already stored for {endpoint} at {window_start}")]
    DuplicateKey { endpoint: String, window_start: i64 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Engine-level failures. Everything except `NoDataAvailable` is transient: the window is
/// retried on the next tick because the cursor has not moved.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no samples recorded and no start timestamp configured")]
    NoDataAvailable,

    #[error("sample query failed ({scope}): {source}")]
    SourceQueryFailed {
        scope: String,
        #[source]
        source: StoreError,
    },

    #[error("report lookup failed for {endpoint} at {window_start}: {source}")]
    SinkQueryFailed {
        endpoint: String,
        window_start: i64,
        #[source]
        source: StoreError,
    },

    #[error("report write failed for {endpoint} at {window_start}: {source}")]
    SinkWriteFailed {
        endpoint: String,
        window_start: i64,
        #[source]
        source: StoreError,
    },
}

impl EngineError {
    pub fn is_transient(&self) -> bool {
        !matches!(self, EngineError::NoDataAvailable)
    }
}
