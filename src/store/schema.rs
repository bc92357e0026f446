// Table definitions. Reports are unique on (endpoint, window_start): that constraint is what
// turns a racing second write into DuplicateKey.

use sqlx::SqlitePool;

pub(super) async fn init_samples_table(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS probe_samples (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            endpoint TEXT NOT NULL,
            observed_at INTEGER NOT NULL,
            latency REAL,
            shaped_latency REAL,
            reliability REAL,
            user_agent TEXT NOT NULL,
            probe_id TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_samples_endpoint_observed_at ON probe_samples(endpoint, observed_at)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_samples_observed_at ON probe_samples(observed_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub(super) async fn init_reports_table(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS endpoint_reports (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            endpoint TEXT NOT NULL,
            window_start INTEGER NOT NULL,
            period INTEGER NOT NULL,
            sample_count INTEGER NOT NULL,
            probe_count INTEGER NOT NULL,
            mean_latency REAL,
            median_latency REAL,
            mean_shaped_latency REAL,
            mean_reliability REAL,
            user_agent_changed INTEGER NOT NULL,
            start_user_agent TEXT,
            end_user_agent TEXT,
            schema_version TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            UNIQUE (endpoint, window_start)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
