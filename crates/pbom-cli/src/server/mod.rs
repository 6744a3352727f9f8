//! HTTP server startup with graceful shutdown.

mod error;
mod http_server;
mod lifecycle;
mod shutdown;

use axum::Router;
pub use error::{ServerError, ServerResult};
use http_server::serve_http;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;

/// Serves `app` until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails
/// while running.
pub async fn serve(
    app: Router,
    config: ServerConfig,
    shutdown: CancellationToken,
) -> ServerResult<()> {
    serve_http(app, config, shutdown).await
}
