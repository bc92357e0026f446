// SqliteStore tests: connect, init, sample queries, report uniqueness, resume lookups

mod common;

use common::{sample, sample_with_agent};
use probe_report::error::StoreError;
use probe_report::models::{Summary, Window};
use probe_report::report::stats::summarize;
use probe_report::store::{ReportSink, SampleSource, SqliteStore};
use tempfile::TempDir;

async fn open(dir: &TempDir) -> SqliteStore {
    let path = dir.path().join("probe.db");
    let store = SqliteStore::connect(path.to_str().unwrap(), 2).await.unwrap();
    store.init().await.unwrap();
    store
}

#[tokio::test]
async fn connect_and_init_twice() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;
    // Second init is no-op (IF NOT EXISTS)
    store.init().await.unwrap();
    assert_eq!(store.earliest_timestamp().await.unwrap(), None);
}

#[tokio::test]
async fn connect_creates_parent_directory() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("probe.db");
    let store = SqliteStore::connect(path.to_str().unwrap(), 1).await.unwrap();
    store.init().await.unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn query_is_half_open_and_per_endpoint() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;
    store
        .save_samples(&[
            sample("ep", 119_999, Some(2.0)),
            sample("ep", 60_000, Some(1.0)),
            sample("ep", 120_000, Some(3.0)),
            sample("ep", 59_999, Some(0.5)),
            sample("other", 90_000, Some(9.0)),
        ])
        .await
        .unwrap();

    let got = store.query("ep", Window::containing(60, 60)).await.unwrap();
    let times: Vec<i64> = got.iter().map(|s| s.observed_at).collect();
    assert_eq!(times, vec![60_000, 119_999]);
    assert_eq!(got[0].latency, Some(1.0));
    assert_eq!(got[0].user_agent, "probe/1.0");

    assert_eq!(store.earliest_timestamp().await.unwrap(), Some(59_999));
}

#[tokio::test]
async fn optional_measurements_round_trip_as_null() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;
    let mut s = sample_with_agent("ep", 1_000, "probe/2.0", "p-9");
    s.latency = None;
    s.reliability = Some(0.9);
    store.save_samples(&[s.clone()]).await.unwrap();

    let got = store.query("ep", Window::containing(0, 60)).await.unwrap();
    assert_eq!(got, vec![s]);
}

#[tokio::test]
async fn report_insert_is_unique_per_endpoint_and_window() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;
    let blank = Summary::blank("ep", Window::containing(60, 60));

    assert!(!store.exists("ep", 60).await.unwrap());
    store.insert(&blank).await.unwrap();
    assert!(store.exists("ep", 60).await.unwrap());
    assert!(!store.exists("ep", 0).await.unwrap());
    assert!(!store.exists("other", 60).await.unwrap());

    let err = store.insert(&blank).await.unwrap_err();
    match err {
        StoreError::DuplicateKey {
            endpoint,
            window_start,
        } => {
            assert_eq!(endpoint, "ep");
            assert_eq!(window_start, 60);
        }
        other => panic!("expected DuplicateKey, got {other}"),
    }

    // same window, different endpoint is fine
    store
        .insert(&Summary::blank("other", Window::containing(60, 60)))
        .await
        .unwrap();
}

#[tokio::test]
async fn reports_read_back_with_absent_statistics_preserved() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;
    let window = Window::containing(120, 60);
    let populated = summarize(
        "ep",
        window,
        &[
            sample_with_agent("ep", 121_000, "probe/1.0", "a"),
            sample_with_agent("ep", 150_000, "probe/1.1", "b"),
        ],
    );
    let blank = Summary::blank("ep", window.next());
    store.insert(&populated).await.unwrap();
    store.insert(&blank).await.unwrap();

    let all = store.list_reports(Some("ep"), 0, 1_000, 10).await.unwrap();
    assert_eq!(all, vec![populated, blank]);
    assert!(all[0].user_agent_changed);
    assert_eq!(all[1].mean_latency, None);
    assert_eq!(all[1].start_user_agent, None);

    let limited = store.list_reports(None, 0, 1_000, 1).await.unwrap();
    assert_eq!(limited.len(), 1);
    let none = store.list_reports(Some("missing"), 0, 1_000, 10).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn latest_window_start_per_endpoint() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;
    assert_eq!(store.latest_window_start("ep").await.unwrap(), None);

    for ws in [0, 60, 120] {
        store
            .insert(&Summary::blank("ep", Window::containing(ws, 60)))
            .await
            .unwrap();
    }
    store
        .insert(&Summary::blank("other", Window::containing(600, 60)))
        .await
        .unwrap();

    assert_eq!(store.latest_window_start("ep").await.unwrap(), Some(120));
    assert_eq!(store.latest_window_start("other").await.unwrap(), Some(600));
}
