//! Imbalance Feed Binary
//!
//! Tails the imbalance logs and keeps the footprint chart series current.
//!
//! # Usage
//!
//! ```bash
//! IMBALANCE_HISTORICAL_LOG=hist.csv IMBALANCE_LIVE_LOG=live.csv cargo run --bin imbalance-feed
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `IMBALANCE_HISTORICAL_LOG`: Cumulative historical log
//! - `IMBALANCE_LIVE_LOG`: Session-framed live log
//!
//! ## Optional
//! - `IMBALANCE_TICK`: Price tick (default: 0.25)
//! - `IMBALANCE_TIME_FACTOR`: Timestamp multiplier (default: 1)
//! - `IMBALANCE_PERIOD_SECS`: Bar period (default: 300)
//! - `IMBALANCE_HIGHLIGHT_THRESHOLD`: Imbalance highlight threshold (default: 3)
//! - `IMBALANCE_POLL_INTERVAL_MS`: Pump cadence (default: 500)
//! - `IMBALANCE_LINE_RETRY_MS`: Partial-line retry delay (default: 500)
//! - `IMBALANCE_HEALTH_PORT`: Health check HTTP port, 0 disables (default: 8083)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: imbalance-feed)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use anyhow::Context as _;
use imbalance_feed::application::ports::SeriesKind;
use imbalance_feed::infrastructure::health::{HealthServer, HealthServerState};
use imbalance_feed::infrastructure::telemetry;
use imbalance_feed::{
    ChartContext, FeedConfig, MemorySurface, Pipeline, PumpExit, StartupLoad, init_metrics,
};
use tokio::signal;

fn main() -> anyhow::Result<()> {
    load_dotenv();

    // The dispatcher and every sink live on this single-threaded loop.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;
    let local = tokio::task::LocalSet::new();

    runtime.block_on(local.run_until(run()))
}

async fn run() -> anyhow::Result<()> {
    // Initialize telemetry (OpenTelemetry + tracing)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting Imbalance Feed");

    // Initialize Prometheus metrics
    if let Err(e) = init_metrics() {
        tracing::warn!(error = %e, "Prometheus recorder unavailable, metrics disabled");
    }

    let config = FeedConfig::from_env()?;
    log_config(&config);

    let context = ChartContext::new();
    let surface = MemorySurface::new();

    if config.server.health_port == 0 {
        tracing::info!("Health server disabled");
    } else {
        let health_state = Arc::new(HealthServerState::new(
            env!("CARGO_PKG_VERSION").to_string(),
            context.pump_state(),
        ));
        let health_server = HealthServer::new(
            config.server.health_port,
            health_state,
            context.closed_token(),
        );
        tokio::spawn(async move {
            if let Err(e) = health_server.run().await {
                tracing::error!(error = %e, "Health server error");
            }
        });
    }

    tokio::spawn(await_shutdown(context.clone()));

    // The startup read can wait on a partial line; keep the loop free for
    // signals and health checks meanwhile.
    let load = {
        let config = config.clone();
        let context = context.clone();
        tokio::task::spawn_blocking(move || StartupLoad::read(&config, &context))
            .await
            .context("startup read task failed")?
    };
    let load = match load {
        Ok(load) => load,
        Err(e) if context.is_closed() => {
            tracing::info!(error = %e, "Shutdown requested during startup read");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let pipeline = Pipeline::start(load, &config, Box::new(surface.clone()), &context)?;

    tracing::info!("Imbalance feed ready");

    let outcome = pipeline.run().await;

    match &outcome.pump {
        PumpExit::Closed => tracing::info!("Update pump stopped cleanly"),
        PumpExit::Failed(e) => tracing::warn!(error = %e, "Update pump had failed before shutdown"),
    }
    tracing::info!(
        updates_applied = outcome.dispatcher.applied(),
        historical_rows = surface.snapshot(SeriesKind::Historical).map_or(0, |r| r.len()),
        live_rows = surface.snapshot(SeriesKind::Live).map(|r| r.len()),
        "Imbalance feed stopped"
    );
    Ok(())
}

/// Log the parsed configuration.
fn log_config(config: &FeedConfig) {
    tracing::info!(
        historical_log = %config.logs.historical.display(),
        live_log = %config.logs.live.display(),
        health_port = config.server.health_port,
        "Configuration loaded"
    );
    tracing::debug!(
        tick = config.chart.tick,
        time_factor = config.chart.time_factor,
        period = config.chart.effective_period(),
        highlight_threshold = config.chart.highlight_threshold,
        poll_interval = ?config.timing.poll_interval,
        line_retry = ?config.timing.line_retry,
        "Chart parameters"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for SIGTERM or SIGINT, then close the chart context.
async fn await_shutdown(context: ChartContext) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    context.close();
}
