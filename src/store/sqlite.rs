// SQLite store for probe samples and endpoint reports.
// Uses sqlx for async + connection pooling; WAL so the ingestion path can keep writing samples
// while reports are produced.

use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

use super::{ReportSink, SampleSource, schema};
use crate::error::StoreError;
use crate::models::{Sample, Summary, Window};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to SQLite at `path`, create parent dir and DB if missing, enable WAL + pragmas.
    pub async fn connect(path: &str, max_pool_size: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        schema::init_samples_table(&self.pool).await?;
        schema::init_reports_table(&self.pool).await?;
        Ok(())
    }

    /// Batch insert of raw samples in one transaction. The real ingestion path writes the same
    /// table; this is what tests and demos use.
    #[instrument(skip(self, samples), fields(repo = "store", operation = "save_samples", samples_count = samples.len()))]
    pub async fn save_samples(&self, samples: &[Sample]) -> anyhow::Result<()> {
        if samples.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for s in samples {
            sqlx::query(
                "INSERT INTO probe_samples (endpoint, observed_at, latency, shaped_latency, reliability, user_agent, probe_id) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(&s.endpoint)
            .bind(s.observed_at)
            .bind(s.latency)
            .bind(s.shaped_latency)
            .bind(s.reliability)
            .bind(&s.user_agent)
            .bind(&s.probe_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Stored reports with window_start in [from, to), optionally for one endpoint.
    /// Order: ascending by window_start, then endpoint.
    #[instrument(skip(self), fields(repo = "store", operation = "list_reports"))]
    pub async fn list_reports(
        &self,
        endpoint: Option<&str>,
        from: i64,
        to: i64,
        limit: u32,
    ) -> anyhow::Result<Vec<Summary>> {
        let rows = sqlx::query(
            "SELECT endpoint, window_start, period, sample_count, probe_count,
                    mean_latency, median_latency, mean_shaped_latency, mean_reliability,
                    user_agent_changed, start_user_agent, end_user_agent, schema_version
             FROM endpoint_reports
             WHERE ($1 IS NULL OR endpoint = $1) AND window_start >= $2 AND window_start < $3
             ORDER BY window_start ASC, endpoint ASC
             LIMIT $4",
        )
        .bind(endpoint)
        .bind(from)
        .bind(to)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(parse_report_row(&row)?);
        }
        Ok(out)
    }

    fn parse_sample_row(row: &SqliteRow) -> Result<Sample, sqlx::Error> {
        Ok(Sample {
            endpoint: row.try_get("endpoint")?,
            observed_at: row.try_get("observed_at")?,
            latency: row.try_get("latency")?,
            shaped_latency: row.try_get("shaped_latency")?,
            reliability: row.try_get("reliability")?,
            user_agent: row.try_get("user_agent")?,
            probe_id: row.try_get("probe_id")?,
        })
    }
}

fn parse_report_row(row: &SqliteRow) -> Result<Summary, sqlx::Error> {
    let period: i64 = row.try_get("period")?;
    let sample_count: i64 = row.try_get("sample_count")?;
    let probe_count: i64 = row.try_get("probe_count")?;
    Ok(Summary {
        endpoint: row.try_get("endpoint")?,
        window_start: row.try_get("window_start")?,
        period: period as u32,
        sample_count: sample_count as u32,
        probe_count: probe_count as u32,
        mean_latency: row.try_get("mean_latency")?,
        median_latency: row.try_get("median_latency")?,
        mean_shaped_latency: row.try_get("mean_shaped_latency")?,
        mean_reliability: row.try_get("mean_reliability")?,
        user_agent_changed: row.try_get("user_agent_changed")?,
        start_user_agent: row.try_get("start_user_agent")?,
        end_user_agent: row.try_get("end_user_agent")?,
        schema_version: row.try_get("schema_version")?,
    })
}

impl SampleSource for SqliteStore {
    #[instrument(skip(self), fields(repo = "store", operation = "earliest_timestamp"))]
    async fn earliest_timestamp(&self) -> Result<Option<i64>, StoreError> {
        let min = sqlx::query_scalar::<_, Option<i64>>("SELECT MIN(observed_at) FROM probe_samples")
            .fetch_one(&self.pool)
            .await?;
        Ok(min)
    }

    #[instrument(skip(self), fields(repo = "store", operation = "query_samples", window_start = window.start))]
    async fn query(&self, endpoint: &str, window: Window) -> Result<Vec<Sample>, StoreError> {
        let rows = sqlx::query(
            "SELECT endpoint, observed_at, latency, shaped_latency, reliability, user_agent, probe_id
             FROM probe_samples
             WHERE endpoint = $1 AND observed_at >= $2 AND observed_at < $3
             ORDER BY observed_at ASC, id ASC",
        )
        .bind(endpoint)
        .bind(window.start_ms())
        .bind(window.end_ms())
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(Self::parse_sample_row(&row)?);
        }
        Ok(out)
    }
}

impl ReportSink for SqliteStore {
    #[instrument(skip(self), fields(repo = "store", operation = "report_exists"))]
    async fn exists(&self, endpoint: &str, window_start: i64) -> Result<bool, StoreError> {
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS(SELECT 1 FROM endpoint_reports WHERE endpoint = $1 AND window_start = $2)",
        )
        .bind(endpoint)
        .bind(window_start)
        .fetch_one(&self.pool)
        .await?;
        Ok(found != 0)
    }

    #[instrument(
        skip(self, summary),
        fields(repo = "store", operation = "insert_report", endpoint = %summary.endpoint, window_start = summary.window_start)
    )]
    async fn insert(&self, summary: &Summary) -> Result<(), StoreError> {
        let created_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        let result = sqlx::query(
            r#"
            INSERT INTO endpoint_reports
            (endpoint, window_start, period, sample_count, probe_count,
             mean_latency, median_latency, mean_shaped_latency, mean_reliability,
             user_agent_changed, start_user_agent, end_user_agent, schema_version, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(&summary.endpoint)
        .bind(summary.window_start)
        .bind(summary.period as i64)
        .bind(summary.sample_count as i64)
        .bind(summary.probe_count as i64)
        .bind(summary.mean_latency)
        .bind(summary.median_latency)
        .bind(summary.mean_shaped_latency)
        .bind(summary.mean_reliability)
        .bind(summary.user_agent_changed)
        .bind(&summary.start_user_agent)
        .bind(&summary.end_user_agent)
        .bind(&summary.schema_version)
        .bind(created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::DuplicateKey {
                    endpoint: summary.endpoint.clone(),
                    window_start: summary.window_start,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), fields(repo = "store", operation = "latest_window_start"))]
    async fn latest_window_start(&self, endpoint: &str) -> Result<Option<i64>, StoreError> {
        let max = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT MAX(window_start) FROM endpoint_reports WHERE endpoint = $1",
        )
        .bind(endpoint)
        .fetch_one(&self.pool)
        .await?;
        Ok(max)
    }
}
