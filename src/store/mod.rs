// Collaborator seams: where samples come from and where reports go.
// SqliteStore implements both; tests plug in in-memory doubles.

mod schema;
mod sqlite;

use std::future::Future;

use crate::error::StoreError;
use crate::models::{Sample, Summary, Window};

pub use sqlite::SqliteStore;

/// Durable store of raw probe samples.
pub trait SampleSource: Send + Sync {
    /// Earliest `observed_at` (unix ms) across all endpoints, or None when empty.
    fn earliest_timestamp(&self) -> impl Future<Output = Result<Option<i64>, StoreError>> + Send;

    /// Samples for `endpoint` observed inside the half-open `window`, ascending by time.
    fn query(
        &self,
        endpoint: &str,
        window: Window,
    ) -> impl Future<Output = Result<Vec<Sample>, StoreError>> + Send;
}

/// Durable, append-only store of report documents, unique on (endpoint, window_start).
pub trait ReportSink: Send + Sync {
    fn exists(
        &self,
        endpoint: &str,
        window_start: i64,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Must fail with `StoreError::DuplicateKey` when the pair is already stored.
    fn insert(&self, summary: &Summary) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Latest stored window start for `endpoint` (used to resume after restart).
    fn latest_window_start(
        &self,
        endpoint: &str,
    ) -> impl Future<Output = Result<Option<i64>, StoreError>> + Send;
}
