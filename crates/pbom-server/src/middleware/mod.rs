//! Middleware for `axum::Router` and HTTP request processing.
//!
//! ```rust,no_run
//! use axum::Router;
//! use pbom_server::middleware::{RecoveryConfig, RouterObservabilityExt, RouterRecoveryExt};
//!
//! let app: Router = Router::new()
//!     .with_recovery(&RecoveryConfig::default())
//!     .with_observability();
//! ```

mod observability;
mod recovery;

pub use observability::{REQUEST_ID_HEADER, RouterObservabilityExt};
pub use recovery::{DEFAULT_REQUEST_TIMEOUT_SECS, RecoveryConfig, RouterRecoveryExt};
