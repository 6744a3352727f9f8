//! All `axum::`[`Router`]s with related `axum::`[`Handler`]s.
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use pbom_server::handler::routes;
//! use pbom_server::service::{ServiceConfig, ServiceState};
//! # use pbom_github::GithubService;
//! # use tokio_util::sync::CancellationToken;
//!
//! # async fn example(github: GithubService) -> anyhow::Result<()> {
//! let config = ServiceConfig::new("webhook-secret");
//! let state = ServiceState::new(&config, github, CancellationToken::new()).await?;
//! let router: axum::Router = routes().with_state(state);
//! # Ok(())
//! # }
//! ```
//!
//! [`Router`]: axum::routing::Router
//! [`Handler`]: axum::handler::Handler

mod error;
mod monitors;
mod response;
mod webhooks;

use axum::Router;
use axum::response::{IntoResponse, Response};

pub use crate::handler::error::{Error, ErrorKind, Result};
pub use crate::handler::response::ServiceStatus;
pub use crate::handler::webhooks::{EVENT_HEADER, MAX_BODY_BYTES, SIGNATURE_HEADER};
use crate::service::ServiceState;

#[inline]
async fn handler() -> Response {
    ErrorKind::NotFound.into_response()
}

/// Returns a [`Router`] with all routes.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .merge(webhooks::routes())
        .merge(monitors::routes())
        .fallback(handler)
}
