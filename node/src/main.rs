// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Bank Token Node
//!
//! Entry point for the `bank-token-node` binary. Parses CLI arguments,
//! initializes logging and metrics, deploys the token instance, and serves
//! the HTTP/WS API.
//!
//! The binary supports two subcommands:
//!
//! - `run`    : deploy a token instance and serve it
//! - `version`: print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;

use bank_token::LedgerHandle;

use cli::{BankTokenCli, Commands};
use metrics::LedgerMetrics;

/// Broadcast channel capacity for live event streaming. Subscribers that
/// fall further behind skip ahead and log the gap.
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = BankTokenCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Deploys the token instance and serves the API and metrics endpoints
/// until a shutdown signal arrives.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(args.log_format).context("failed to install tracing subscriber")?;

    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        "starting bank-token-node"
    );

    // --- Ledger ---
    let (ledger, deployment) = LedgerHandle::deploy(args.token_config());
    tracing::info!(
        contract = %deployment.contract_address,
        tx = %deployment.transaction_hash,
        "token instance ready"
    );

    // --- Metrics ---
    let ledger_metrics =
        Arc::new(LedgerMetrics::new().context("failed to register prometheus metrics")?);
    ledger.read(|token| ledger_metrics.observe(token));

    // --- Event broadcast ---
    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

    // --- Application state ---
    let app_state = api::AppState {
        version: env!("CARGO_PKG_VERSION").to_string(),
        ledger,
        event_tx,
        metrics: Arc::clone(&ledger_metrics),
    };

    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(ledger_metrics);

    // --- Serve until either server fails or a signal arrives ---
    tokio::select! {
        res = serve("api", args.rpc_port, api::create_router(app_state)) => res?,
        res = serve("metrics", args.metrics_port, metrics_router) => res?,
        name = shutdown_signal() => tracing::info!(signal = name, "shutting down"),
    }

    tracing::info!("bank-token-node stopped");
    Ok(())
}

/// Binds `0.0.0.0:port` and serves `router` on it.
async fn serve(name: &'static str, port: u16, router: axum::Router) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {} listener on {}", name, addr))?;
    tracing::info!(server = name, %addr, "listening");
    axum::serve(listener, router)
        .await
        .with_context(|| format!("{} server failed", name))
}

/// Prints version information to stdout.
fn print_version() {
    println!("bank-token-node {}", env!("CARGO_PKG_VERSION"));
    println!("rustc           {}", option_env!("RUSTC_VERSION").unwrap_or("unknown"));
}

/// Resolves with the name of the first termination signal received.
///
/// SIGTERM is only watched on Unix. A listener that cannot be installed is
/// logged and left pending, so the other one still works.
async fn shutdown_signal() -> &'static str {
    let interrupt = async {
        match signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(e) => never("SIGINT", e).await,
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                "SIGTERM"
            }
            Err(e) => never("SIGTERM", e).await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    tokio::select! {
        name = interrupt => name,
        name = terminate => name,
    }
}

async fn never(signal: &str, err: std::io::Error) -> &'static str {
    tracing::error!(signal, error = %err, "cannot listen for signal");
    std::future::pending().await
}
