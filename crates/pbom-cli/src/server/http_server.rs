//! HTTP server startup.

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::TRACING_TARGET_SERVER_STARTUP;
use crate::config::ServerConfig;
use crate::server::lifecycle::serve_with_shutdown;
use crate::server::shutdown::cancel_on_signal;
use crate::server::{ServerError, ServerResult};

/// Starts an HTTP server that stops accepting connections once `shutdown`
/// is cancelled.
///
/// `SIGINT` and `SIGTERM` cancel `shutdown`, which also cancels every
/// background enrichment derived from it.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails
/// while running.
pub async fn serve_http(
    app: Router,
    server_config: ServerConfig,
    shutdown: CancellationToken,
) -> ServerResult<()> {
    let server_addr = server_config.server_addr();

    let listener = match TcpListener::bind(server_addr).await {
        Ok(listener) => {
            tracing::info!(
                target: TRACING_TARGET_SERVER_STARTUP,
                addr = %server_addr,
                "Server is ready and listening for connections"
            );
            listener
        }
        Err(listener_err) => {
            let error = ServerError::bind_error(server_addr, listener_err);

            tracing::error!(
                target: TRACING_TARGET_SERVER_STARTUP,
                addr = %server_addr,
                error = %error,
                code = error.error_code(),
                suggestion = error.suggestion(),
                "Failed to bind to address"
            );

            return Err(error);
        }
    };

    tokio::spawn(cancel_on_signal(shutdown.clone()));

    let graceful = shutdown.clone().cancelled_owned();
    let serve = async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(graceful)
            .await
    };

    serve_with_shutdown(&server_config, shutdown, serve).await
}
