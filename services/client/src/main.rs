use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use client::config::LoggingConfig;
use client::{Config, CsvBetSource, LifecycleController};

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(code) => code,
        Err(e) => {
            error!(action = "startup", result = "fail", error = %format!("{:#}", e));
            1
        }
    };
    std::process::exit(code);
}

async fn run() -> Result<i32> {
    dotenvy::dotenv().ok();
    init_logging(&LoggingConfig::from_env());

    tracing::info!(
        service = "client",
        version = env!("CARGO_PKG_VERSION"),
        "Starting agency client"
    );

    // Load configuration
    let config = Config::load().context("invalid configuration")?;
    config.log_summary();

    if let Some(port) = config.metrics_port {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("failed to start metrics listener")?;
        info!(%addr, "Client metrics listening");
    }

    let mut source = CsvBetSource::open_at(&config.data.file, config.data.start_offset)
        .context("failed to open bets file")?;

    let cancel = CancellationToken::new();
    spawn_signal_listener(cancel.clone());

    let mut controller = LifecycleController::new(config.client.clone(), cancel);
    let outcome = controller.run(&mut source).await;

    info!(
        state = ?outcome.state(),
        bets_sent = controller.bets_sent(),
        batches_sent = controller.batches_sent(),
        skipped_rows = source.skipped(),
        "Client stopped"
    );

    Ok(outcome.exit_code())
}

fn init_logging(logging: &LoggingConfig) {
    // RUST_LOG wins over CLI_LOG_LEVEL when both are set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("client={0},shared={0}", logging.level.to_lowercase()).into());

    if logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Cancel the run on SIGINT or SIGTERM
fn spawn_signal_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = termination_signal().await {
            warn!(error = %e, "Could not listen for termination signals");
            return;
        }
        info!(action = "shutdown", result = "in_progress");
        cancel.cancel();
    });
}

#[cfg(unix)]
async fn termination_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = terminate.recv() => Ok(()),
        res = tokio::signal::ctrl_c() => res,
    }
}

#[cfg(not(unix))]
async fn termination_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
