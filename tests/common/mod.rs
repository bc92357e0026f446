// Shared test helpers: in-memory Sample Source / Report Sink, manual clock, sample builders.
#![allow(dead_code)]

use probe_report::clock::Clock;
use probe_report::error::StoreError;
use probe_report::models::{Sample, Summary, Window};
use probe_report::scheduler::SchedulerConfig;
use probe_report::store::{ReportSink, SampleSource};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

pub fn sample(endpoint: &str, observed_at_ms: i64, latency: Option<f64>) -> Sample {
    Sample {
        endpoint: endpoint.to_string(),
        observed_at: observed_at_ms,
        latency,
        shaped_latency: None,
        reliability: None,
        user_agent: "probe/1.0".to_string(),
        probe_id: "probe-a".to_string(),
    }
}

pub fn sample_with_agent(
    endpoint: &str,
    observed_at_ms: i64,
    user_agent: &str,
    probe_id: &str,
) -> Sample {
    Sample {
        user_agent: user_agent.to_string(),
        probe_id: probe_id.to_string(),
        ..sample(endpoint, observed_at_ms, Some(10.0))
    }
}

pub fn scheduler_config(endpoints: &[&str]) -> SchedulerConfig {
    SchedulerConfig {
        endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
        period_secs: 60,
        start_timestamp: None,
        wait_interval: Duration::from_secs(15),
        backoff_interval: Duration::from_secs(1),
        max_concurrent_endpoints: 2,
    }
}

/// Wall clock the test moves by hand.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn at(secs: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(secs)),
        }
    }

    pub fn set(&self, secs: i64) {
        self.now.store(secs, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// In-memory store implementing both collaborator interfaces, with failure switches and call
/// counters.
#[derive(Default)]
pub struct MemoryStore {
    samples: Mutex<Vec<Sample>>,
    reports: Mutex<BTreeMap<(String, i64), Summary>>,
    pub query_calls: AtomicUsize,
    pub insert_calls: AtomicUsize,
    pub fail_queries: AtomicBool,
    pub fail_inserts: AtomicBool,
    /// Make `exists` always answer false, to simulate a writer racing past the guard.
    pub blind_exists: AtomicBool,
    /// Called after every successful insert.
    on_insert: Mutex<Option<Box<dyn Fn(&Summary) + Send + Sync>>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_samples(samples: Vec<Sample>) -> Arc<Self> {
        let store = Self::default();
        *store.samples.lock().unwrap() = samples;
        Arc::new(store)
    }

    pub fn add_samples(&self, samples: Vec<Sample>) {
        self.samples.lock().unwrap().extend(samples);
    }

    pub fn set_on_insert(&self, hook: impl Fn(&Summary) + Send + Sync + 'static) {
        *self.on_insert.lock().unwrap() = Some(Box::new(hook));
    }

    /// Pre-seed a stored report, as if written by an earlier run.
    pub fn put_report(&self, summary: Summary) {
        self.reports
            .lock()
            .unwrap()
            .insert((summary.endpoint.clone(), summary.window_start), summary);
    }

    pub fn report(&self, endpoint: &str, window_start: i64) -> Option<Summary> {
        self.reports
            .lock()
            .unwrap()
            .get(&(endpoint.to_string(), window_start))
            .cloned()
    }

    pub fn report_count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }

    /// Window starts stored for one endpoint, ascending.
    pub fn window_starts(&self, endpoint: &str) -> Vec<i64> {
        self.reports
            .lock()
            .unwrap()
            .keys()
            .filter(|(e, _)| e == endpoint)
            .map(|(_, ws)| *ws)
            .collect()
    }
}

impl SampleSource for MemoryStore {
    async fn earliest_timestamp(&self) -> Result<Option<i64>, StoreError> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("samples offline".into()));
        }
        Ok(self.samples.lock().unwrap().iter().map(|s| s.observed_at).min())
    }

    async fn query(&self, endpoint: &str, window: Window) -> Result<Vec<Sample>, StoreError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("samples offline".into()));
        }
        let mut out: Vec<Sample> = self
            .samples
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.endpoint == endpoint && window.contains_ms(s.observed_at))
            .cloned()
            .collect();
        out.sort_by_key(|s| s.observed_at);
        Ok(out)
    }
}

impl ReportSink for MemoryStore {
    async fn exists(&self, endpoint: &str, window_start: i64) -> Result<bool, StoreError> {
        if self.blind_exists.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(self
            .reports
            .lock()
            .unwrap()
            .contains_key(&(endpoint.to_string(), window_start)))
    }

    async fn insert(&self, summary: &Summary) -> Result<(), StoreError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reports offline".into()));
        }
        let mut reports = self.reports.lock().unwrap();
        let key = (summary.endpoint.clone(), summary.window_start);
        if reports.contains_key(&key) {
            return Err(StoreError::DuplicateKey {
                endpoint: summary.endpoint.clone(),
                window_start: summary.window_start,
            });
        }
        reports.insert(key, summary.clone());
        drop(reports);
        if let Some(hook) = self.on_insert.lock().unwrap().as_ref() {
            hook(summary);
        }
        Ok(())
    }

    async fn latest_window_start(&self, endpoint: &str) -> Result<Option<i64>, StoreError> {
        Ok(self.window_starts(endpoint).into_iter().max())
    }
}
