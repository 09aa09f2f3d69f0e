//! Process wiring for the ethgate JSON-RPC gateway: CLI, logging, config
//! bootstrap, background tasks and the HTTP listener with graceful
//! shutdown.

mod router;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ethgate_core::chain::ChainState;
use ethgate_core::config::{ConfigController, FileSource};
use ethgate_core::upstream::HttpClient;

use router::AppState;

#[derive(Debug, Parser)]
#[command(name = "ethgate", about = "JSON-RPC gateway for Ethereum node upstreams")]
struct Args {
    /// Path to the JSON config document, polled for hot reloads.
    #[arg(long, default_value = "./config.json")]
    config: PathBuf,

    /// Listen address for the client-facing endpoint.
    #[arg(long, default_value = "0.0.0.0:3005")]
    listen: SocketAddr,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ethgate_core=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let client = HttpClient::new().context("building shared http client")?;

    // First load is mandatory: without a valid config there is nothing
    // to serve, so the error exits the process here.
    let source = FileSource::new(&args.config);
    let (controller, config) = ConfigController::bootstrap(Box::new(source), client)
        .with_context(|| format!("loading initial config from {}", args.config.display()))?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let controller_task = controller.spawn(shutdown_tx.subscribe());

    let chain = Arc::new(ChainState::new());
    let chain_task = chain.spawn_poller(config.clone(), shutdown_tx.subscribe());

    let app = router::build_router(AppState { config, chain });
    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("binding {}", args.listen))?;
    info!(address = %args.listen, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
        .context("serving")?;

    // In-flight dispatches finish or hit their own timeouts; the
    // background loops have already been told to stop.
    let _ = controller_task.await;
    let _ = chain_task.await;
    info!("stopped");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM, then fans the shutdown out to the
/// background tasks before the server starts draining.
async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => tracing::error!(%error, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    info!("shutdown signal received");
    let _ = shutdown_tx.send(());
}
