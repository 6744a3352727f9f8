//! Server lifecycle management.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::server::{ServerError, ServerResult};
use crate::{TRACING_TARGET_SERVER_SHUTDOWN, TRACING_TARGET_SERVER_STARTUP};

/// Serves with lifecycle logging and a bounded shutdown window.
///
/// Once `shutdown` is cancelled, the server future gets `grace` to finish
/// in-flight requests before it is dropped.
///
/// # Errors
///
/// Returns the server's runtime error with a recovery suggestion logged.
pub async fn serve_with_shutdown<F>(
    server_config: &ServerConfig,
    shutdown: CancellationToken,
    serve: F,
) -> ServerResult<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    let start_time = Instant::now();

    log_security_warnings(server_config);

    let result = drain_within(serve, &shutdown, server_config.shutdown_timeout()).await;

    handle_result(result, start_time)
}

/// Runs `serve` to completion, or until `grace` has passed since `shutdown`.
async fn drain_within<F>(
    serve: F,
    shutdown: &CancellationToken,
    grace: Duration,
) -> std::io::Result<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    let deadline = async {
        shutdown.cancelled().await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = serve => result,
        () = deadline => {
            tracing::warn!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                grace_secs = grace.as_secs(),
                "Shutdown window elapsed, dropping remaining connections"
            );
            Ok(())
        }
    }
}

/// Logs security warnings for potentially unsafe configurations.
fn log_security_warnings(config: &ServerConfig) {
    if config.binds_to_all_interfaces() {
        tracing::warn!(
            target: TRACING_TARGET_SERVER_STARTUP,
            "Server bound to all interfaces - ensure firewall is configured"
        );
    }
}

/// Handles the server result and logs appropriate messages.
fn handle_result(result: std::io::Result<()>, start_time: Instant) -> ServerResult<()> {
    let uptime = start_time.elapsed();

    match result {
        Ok(()) => {
            tracing::info!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                uptime_secs = uptime.as_secs(),
                "Shutdown completed"
            );
            Ok(())
        }
        Err(err) => {
            let error = ServerError::Runtime(err);

            tracing::error!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                error = %error,
                code = error.error_code(),
                uptime_secs = uptime.as_secs(),
                "Fatal error"
            );

            if let Some(suggestion) = error.suggestion() {
                tracing::info!(
                    target: TRACING_TARGET_SERVER_SHUTDOWN,
                    suggestion = suggestion,
                    "Recovery suggestion"
                );
            }

            Err(error)
        }
    }
}
