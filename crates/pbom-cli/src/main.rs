#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod server;
mod telemetry;

use std::process;

use anyhow::Context;
use axum::Router;
use pbom_github::GithubService;
use pbom_github::reqwest::ReqwestClient;
use pbom_server::handler::routes;
use pbom_server::middleware::{RecoveryConfig, RouterObservabilityExt, RouterRecoveryExt};
use pbom_server::service::ServiceState;
use tokio_util::sync::CancellationToken;

use crate::config::Cli;

// Tracing target constants
pub const TRACING_TARGET_SERVER_STARTUP: &str = "pbom_cli::server::startup";
pub const TRACING_TARGET_SERVER_SHUTDOWN: &str = "pbom_cli::server::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "pbom_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            "application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error = format!("{error:#}"),
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    telemetry::init_tracing(cli.log_json)?;

    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        version = env!("CARGO_PKG_VERSION"),
        "starting pbom webhook server"
    );

    cli.log();
    cli.validate()?;

    let shutdown = CancellationToken::new();
    let github = create_github_service(&cli)?;
    let state = ServiceState::new(&cli.service, github, shutdown.clone())
        .await
        .context("failed to create service state")?;
    let dispatcher = state.dispatcher.clone();
    let drain_timeout = cli.server.shutdown_timeout();
    let router = create_router(state, &cli.recovery);

    server::serve(router, cli.server, shutdown).await?;

    // Cancelled enrichments still write their fallback records.
    if !dispatcher.drain(drain_timeout).await {
        tracing::warn!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            "exiting with enrichments still running"
        );
    }

    Ok(())
}

/// Creates the GitHub API client.
fn create_github_service(cli: &Cli) -> anyhow::Result<GithubService> {
    let client =
        ReqwestClient::new(cli.github.clone()).context("failed to create GitHub client")?;
    Ok(client.into_service())
}

/// Creates the router with all middleware layers applied.
///
/// Middleware is applied in reverse order (last added = outermost):
/// 1. Recovery (outermost) - catches panics and enforces timeouts
/// 2. Observability - request IDs and tracing spans
/// 3. Routes (innermost) - actual request handlers
fn create_router(state: ServiceState, recovery: &RecoveryConfig) -> Router {
    routes()
        .with_state(state)
        .with_observability()
        .with_recovery(recovery)
}
