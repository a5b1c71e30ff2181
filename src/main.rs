mod alert;
mod app;
mod config;
mod http;
mod metrics;
mod registry;
mod state;
mod ticker;

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use dotenvy::Error as DotenvError;
use tokio::task::JoinHandle;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::app::AppContext;
use crate::registry::MachineRegistry;

#[derive(Debug, Parser)]
#[command(author, version, about = "floormon — manufacturing floor production monitor")]
struct Cli {
    /// Path to YAML configuration file. Defaults to env FLOORMON_CONFIG or built-in defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let cli = Cli::parse();

    let config = config::load_config(cli.config.as_deref())?;
    let bind_addr: SocketAddr = config
        .http
        .bind
        .parse()
        .context("invalid http.bind address")?;

    let metrics = metrics::AppMetrics::new()?;
    let registry = match config.machines.clone() {
        Some(machines) => MachineRegistry::new(machines),
        None => MachineRegistry::default_floor(),
    };

    let started_at = Utc::now();
    let state = state::SharedState::new(
        &registry,
        config.alerts.idle_threshold_minutes,
        started_at,
    );
    state.seed_alerts(alert::initial_alerts(started_at)).await;

    let ctx = AppContext::new(config, registry, metrics, state);

    let loop_handles = ticker::spawn_all(ctx.clone());
    let router = http::create_router(ctx.clone());

    info!("floormon listening on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .context("failed to bind HTTP listener")?;

    if let Err(err) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = ?err, "server terminated with error");
    }

    shutdown_loops(loop_handles);

    Ok(())
}

fn load_env() {
    if let Err(err) = dotenvy::dotenv() {
        match err {
            DotenvError::Io(io_err) if io_err.kind() == ErrorKind::NotFound => {}
            other => eprintln!("warning: failed to load .env file: {other}"),
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("floormon=info,axum::rejection=trace"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = ?err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            sigterm.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}

fn shutdown_loops(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        handle.abort();
    }
}
