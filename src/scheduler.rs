// Backfill scheduler: determine where to start, then walk forward one closed window at a time.
// Every configured endpoint is aggregated for a window before the cursor moves, so the stored
// reports stay a gap-free prefix. Pauses when caught up with the present (WaitingForData) and
// backs off briefly when another cycle holds the cycle lock (BackingOff).

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument, warn};

use crate::clock::Clock;
use crate::config::ReportConfig;
use crate::error::EngineError;
use crate::models::Window;
use crate::report::{ProcessOutcome, WindowAggregator};
use crate::store::{ReportSink, SampleSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchedulerState {
    DeterminingStart,
    Advancing,
    WaitingForData,
    BackingOff,
    Stopped,
}

/// Snapshot published on every state or cursor change.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    /// Start (unix seconds) of the next window to process.
    pub cursor: Option<i64>,
    pub windows_completed: u64,
    pub reports_written: u64,
    pub last_error: Option<String>,
}

impl Default for SchedulerStatus {
    fn default() -> Self {
        Self {
            state: SchedulerState::DeterminingStart,
            cursor: None,
            windows_completed: 0,
            reports_written: 0,
            last_error: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub endpoints: Vec<String>,
    pub period_secs: u32,
    /// Fixed start (unix seconds). None: start from the earliest stored sample.
    pub start_timestamp: Option<i64>,
    pub wait_interval: Duration,
    pub backoff_interval: Duration,
    /// Endpoints aggregated concurrently within one window.
    pub max_concurrent_endpoints: usize,
}

impl From<&ReportConfig> for SchedulerConfig {
    fn from(c: &ReportConfig) -> Self {
        Self {
            endpoints: c.endpoints.clone(),
            period_secs: c.period_secs,
            start_timestamp: c.start_timestamp.map(|t| t.timestamp()),
            wait_interval: Duration::from_secs(c.wait_interval_secs),
            backoff_interval: Duration::from_millis(c.backoff_interval_ms),
            max_concurrent_endpoints: c.max_concurrent_endpoints,
        }
    }
}

/// Held for the duration of one advance cycle. Share it between schedulers writing to the same
/// store to keep their cycles from overlapping.
pub type CycleLock = Arc<Mutex<()>>;

/// Control surface usable from outside the scheduler task.
#[derive(Clone)]
pub struct SchedulerHandle {
    status_rx: watch::Receiver<SchedulerStatus>,
    stop_tx: Arc<watch::Sender<bool>>,
}

impl SchedulerHandle {
    /// Request shutdown; honoured at the next checkpoint (between endpoints or windows).
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    pub fn is_stop_requested(&self) -> bool {
        *self.stop_tx.borrow()
    }

    pub fn status(&self) -> SchedulerStatus {
        self.status_rx.borrow().clone()
    }

    pub fn state(&self) -> SchedulerState {
        self.status_rx.borrow().state
    }

    pub fn subscribe(&self) -> watch::Receiver<SchedulerStatus> {
        self.status_rx.clone()
    }
}

/// How one window ended.
enum WindowResult {
    Complete { written: u64 },
    Interrupted,
}

pub struct Scheduler<S, R, C> {
    config: SchedulerConfig,
    source: Arc<S>,
    sink: Arc<R>,
    aggregator: WindowAggregator<S, R>,
    clock: C,
    cycle_lock: CycleLock,
    cursor: Option<Window>,
    status_tx: watch::Sender<SchedulerStatus>,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

fn stop_requested(rx: &watch::Receiver<bool>) -> bool {
    *rx.borrow()
}

impl<S, R, C> Scheduler<S, R, C>
where
    S: SampleSource,
    R: ReportSink,
    C: Clock,
{
    /// The cycle lock is private to this scheduler; `BackingOff` only happens once a shared
    /// lock is passed in with [`Scheduler::with_cycle_lock`].
    pub fn new(config: SchedulerConfig, source: Arc<S>, sink: Arc<R>, clock: C) -> Self {
        let aggregator = WindowAggregator::new(Arc::clone(&source), Arc::clone(&sink));
        let (status_tx, _) = watch::channel(SchedulerStatus::default());
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            config,
            source,
            sink,
            aggregator,
            clock,
            cycle_lock: Arc::new(Mutex::new(())),
            cursor: None,
            status_tx,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
        }
    }

    pub fn with_cycle_lock(mut self, lock: CycleLock) -> Self {
        self.cycle_lock = lock;
        self
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            status_rx: self.status_tx.subscribe(),
            stop_tx: Arc::clone(&self.stop_tx),
        }
    }

    pub fn cursor(&self) -> Option<Window> {
        self.cursor
    }

    pub fn state(&self) -> SchedulerState {
        self.status_tx.borrow().state
    }

    fn set_state(&self, state: SchedulerState) {
        self.status_tx.send_if_modified(|s| {
            if s.state == state {
                return false;
            }
            debug!(from = ?s.state, to = ?state, "scheduler state");
            s.state = state;
            true
        });
    }

    fn record_error(&self, e: &EngineError) {
        let msg = e.to_string();
        self.status_tx.send_modify(|s| s.last_error = Some(msg));
    }

    /// DETERMINING_START: configured start or earliest sample, aligned down, then moved forward
    /// past windows every endpoint already has a report for.
    #[instrument(skip(self), fields(endpoints = self.config.endpoints.len()))]
    pub async fn start(&mut self) -> Result<Window, EngineError> {
        self.set_state(SchedulerState::DeterminingStart);
        let period = self.config.period_secs;

        let start = match self.config.start_timestamp {
            Some(ts) => Window::containing(ts, period),
            None => {
                let earliest = self.source.earliest_timestamp().await.map_err(|source| {
                    EngineError::SourceQueryFailed {
                        scope: "earliest sample".to_string(),
                        source,
                    }
                })?;
                let Some(ts_ms) = earliest else {
                    return Err(EngineError::NoDataAvailable);
                };
                Window::containing_ms(ts_ms, period)
            }
        };

        let cursor = self.resume_point(start).await?;
        self.cursor = Some(cursor);
        self.status_tx.send_modify(|s| s.cursor = Some(cursor.start));
        info!(
            start = start.start,
            cursor = cursor.start,
            period_secs = period,
            "backfill start determined"
        );
        self.set_state(SchedulerState::Advancing);
        Ok(cursor)
    }

    /// First window some endpoint still lacks: min over endpoints of (latest stored + period),
    /// never earlier than `start`. An endpoint with no reports pins the cursor to `start`.
    async fn resume_point(&self, start: Window) -> Result<Window, EngineError> {
        let period = self.config.period_secs;
        let mut resume: Option<i64> = None;
        for endpoint in &self.config.endpoints {
            let latest = self
                .sink
                .latest_window_start(endpoint)
                .await
                .map_err(|source| EngineError::SinkQueryFailed {
                    endpoint: endpoint.clone(),
                    window_start: start.start,
                    source,
                })?;
            let next = match latest {
                Some(ws) => Window::containing(ws, period).next().start.max(start.start),
                None => start.start,
            };
            resume = Some(resume.map_or(next, |r| r.min(next)));
        }
        Ok(Window::containing(resume.unwrap_or(start.start), period))
    }

    /// ADVANCING: process closed windows until caught up. Returns the state to pause in next
    /// (WaitingForData, BackingOff) or Stopped. On error the cursor stays on the failed window.
    pub async fn run_cycle(&mut self) -> Result<SchedulerState, EngineError> {
        let mut cursor = match self.cursor {
            Some(c) => c,
            None => self.start().await?,
        };

        let lock = Arc::clone(&self.cycle_lock);
        let Ok(_cycle) = lock.try_lock() else {
            debug!("aggregation cycle already in flight");
            self.set_state(SchedulerState::BackingOff);
            return Ok(SchedulerState::BackingOff);
        };
        self.set_state(SchedulerState::Advancing);

        let mut advanced: u64 = 0;
        loop {
            if stop_requested(&self.stop_rx) {
                self.set_state(SchedulerState::Stopped);
                return Ok(SchedulerState::Stopped);
            }
            // "present" is re-read every iteration; the open window is never touched
            if !cursor.is_closed_at(self.clock.now_secs()) {
                break;
            }

            match self.process_window(cursor).await? {
                WindowResult::Complete { written } => {
                    cursor = cursor.next();
                    self.cursor = Some(cursor);
                    advanced += 1;
                    self.status_tx.send_modify(|s| {
                        s.cursor = Some(cursor.start);
                        s.windows_completed += 1;
                        s.reports_written += written;
                        s.last_error = None;
                    });
                }
                WindowResult::Interrupted => {
                    self.set_state(SchedulerState::Stopped);
                    return Ok(SchedulerState::Stopped);
                }
            }
        }

        if advanced > 0 {
            info!(windows = advanced, cursor = cursor.start, "backfill advanced");
        }
        self.set_state(SchedulerState::WaitingForData);
        Ok(SchedulerState::WaitingForData)
    }

    /// All endpoints for one window, up to `max_concurrent_endpoints` at a time.
    #[instrument(skip(self, window), fields(window_start = window.start))]
    async fn process_window(&self, window: Window) -> Result<WindowResult, EngineError> {
        let mut written: u64 = 0;
        let mut first_error: Option<EngineError> = None;
        let chunk_size = self.config.max_concurrent_endpoints.max(1);

        for chunk in self.config.endpoints.chunks(chunk_size) {
            if stop_requested(&self.stop_rx) {
                return Ok(WindowResult::Interrupted);
            }
            let mut pending = Vec::with_capacity(chunk.len());
            for endpoint in chunk {
                pending.push(self.aggregator.process(endpoint, window));
            }
            for (endpoint, result) in chunk.iter().zip(join_all(pending).await) {
                match result {
                    Ok(ProcessOutcome::Written(_)) => written += 1,
                    Ok(ProcessOutcome::AlreadyProcessed) => {}
                    Err(e) => {
                        warn!(endpoint = %endpoint, error = %e, "window aggregation failed");
                        first_error.get_or_insert(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(WindowResult::Complete { written }),
        }
    }

    async fn pause(&mut self, duration: Duration) {
        if stop_requested(&self.stop_rx) {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.stop_rx.changed() => {}
        }
    }

    /// Start (if not already started) and loop until stopped. Transient errors are logged and
    /// retried after the wait interval; only a failing `start` is returned.
    pub async fn run(mut self) -> Result<(), EngineError> {
        if self.cursor.is_none() {
            self.start().await?;
        }

        loop {
            let next = match self.run_cycle().await {
                Ok(state) => state,
                Err(e) => {
                    warn!(error = %e, "aggregation cycle failed; cursor kept for retry");
                    self.record_error(&e);
                    self.set_state(SchedulerState::WaitingForData);
                    SchedulerState::WaitingForData
                }
            };
            match next {
                SchedulerState::Stopped => break,
                SchedulerState::BackingOff => self.pause(self.config.backoff_interval).await,
                _ => self.pause(self.config.wait_interval).await,
            }
            if stop_requested(&self.stop_rx) {
                break;
            }
        }

        self.set_state(SchedulerState::Stopped);
        info!("scheduler stopped");
        Ok(())
    }
}

/// Spawns the scheduler. Start failures (no samples yet, store unavailable) are retried after
/// the wait interval until a start point is found or stop is requested.
pub fn spawn<S, R, C>(mut scheduler: Scheduler<S, R, C>) -> tokio::task::JoinHandle<()>
where
    S: SampleSource + 'static,
    R: ReportSink + 'static,
    C: Clock + 'static,
{
    tokio::spawn(async move {
        while scheduler.cursor.is_none() {
            if stop_requested(&scheduler.stop_rx) {
                scheduler.set_state(SchedulerState::Stopped);
                return;
            }
            match scheduler.start().await {
                Ok(_) => break,
                Err(e) => {
                    warn!(error = %e, "could not determine backfill start; retrying");
                    scheduler.record_error(&e);
                    let wait = scheduler.config.wait_interval;
                    scheduler.pause(wait).await;
                }
            }
        }
        if let Err(e) = scheduler.run().await {
            warn!(error = %e, "scheduler exited with error");
        }
    })
}
