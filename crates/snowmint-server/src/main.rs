#![doc = include_str!("../README.md")]

mod server;

use anyhow::Context;
use clap::Parser;
use server::config::{CliArgs, ServerConfig};
use server::service::handler::{AppState, router};
use server::telemetry::init_telemetry;
use tokio::net::TcpListener;
use tokio::signal;

// mimalloc holds up better than the system allocator under contention,
// especially on musl.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry()?;

    let state = AppState::from_config(&config).context("failed to initialize ID worker")?;
    let listener = TcpListener::bind(config.server_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server_addr))?;

    log_startup_info(&config);

    let result = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error");

    tracing::info!("Service shut down");
    providers.shutdown();
    result
}

fn log_startup_info(config: &ServerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!(
            "Starting ID service on {} with full config: {:#?}",
            config.server_addr,
            config
        );
    } else {
        tracing::info!(
            addr = %config.server_addr,
            datacenter_id = config.datacenter_id,
            worker_id = config.worker_id,
            "Starting ID service"
        );
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    tracing::info!("Shutdown signal received, draining connections...");
}
