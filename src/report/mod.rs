// Window aggregation: guard check, sample fetch, reduction, write-once persistence.
// The reduction itself lives in `stats` and is pure.

pub mod guard;
pub mod stats;

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::{EngineError, StoreError};
use crate::models::{Summary, Window};
use crate::store::{ReportSink, SampleSource};

pub use guard::IdempotencyGuard;

/// Result of processing one (endpoint, window) pair.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// A new report was stored (blank when the window had no samples).
    Written(Summary),
    /// A report already existed, either before the call or via a racing writer.
    AlreadyProcessed,
}

impl ProcessOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, ProcessOutcome::Written(_))
    }
}

pub struct WindowAggregator<S, R> {
    source: Arc<S>,
    sink: Arc<R>,
    guard: IdempotencyGuard<R>,
}

impl<S, R> Clone for WindowAggregator<S, R> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            sink: Arc::clone(&self.sink),
            guard: self.guard.clone(),
        }
    }
}

impl<S: SampleSource, R: ReportSink> WindowAggregator<S, R> {
    pub fn new(source: Arc<S>, sink: Arc<R>) -> Self {
        let guard = IdempotencyGuard::new(Arc::clone(&sink));
        Self {
            source,
            sink,
            guard,
        }
    }

    #[instrument(skip(self, window), fields(window_start = window.start))]
    pub async fn process(&self, endpoint: &str, window: Window) -> Result<ProcessOutcome, EngineError> {
        if self.guard.already_processed(endpoint, window).await? {
            debug!("report already stored, skipping");
            return Ok(ProcessOutcome::AlreadyProcessed);
        }

        let samples = self
            .source
            .query(endpoint, window)
            .await
            .map_err(|source| EngineError::SourceQueryFailed {
                scope: format!("{} at {}", endpoint, window.start),
                source,
            })?;

        // Stray rows outside the half-open window never reach the reduction.
        let samples: Vec<_> = samples
            .into_iter()
            .filter(|s| s.endpoint == endpoint && window.contains_ms(s.observed_at))
            .collect();

        let summary = stats::summarize(endpoint, window, &samples);

        match self.sink.insert(&summary).await {
            Ok(()) => {
                debug!(
                    sample_count = summary.sample_count,
                    blank = summary.is_blank(),
                    "report stored"
                );
                Ok(ProcessOutcome::Written(summary))
            }
            Err(StoreError::DuplicateKey { .. }) => {
                debug!("report written concurrently, treating as processed");
                Ok(ProcessOutcome::AlreadyProcessed)
            }
            Err(source) => Err(EngineError::SinkWriteFailed {
                endpoint: endpoint.to_string(),
                window_start: window.start,
                source,
            }),
        }
    }
}
