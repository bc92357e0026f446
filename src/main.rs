use anyhow::Result;
use probe_report::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!(
        name = version::NAME,
        version = version::VERSION,
        endpoints = app_config.report.endpoints.len(),
        "starting"
    );

    let store = Arc::new(
        store::SqliteStore::connect(&app_config.database.path, app_config.database.max_pool_size)
            .await?,
    );
    store.init().await?;

    let scheduler = scheduler::Scheduler::new(
        scheduler::SchedulerConfig::from(&app_config.report),
        store.clone(),
        store.clone(),
        clock::SystemClock,
    );
    let handle = scheduler.handle();
    let scheduler_task = scheduler::spawn(scheduler);

    let app = routes::app(handle.clone(), store, app_config.clone());
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
        }
    }

    // The scheduler finishes the endpoint calls in flight, then stops.
    handle.stop();
    if let Err(e) = scheduler_task.await {
        tracing::warn!(error = %e, "scheduler task panicked");
    }

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
