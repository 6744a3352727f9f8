//! Application state and dependency injection.

mod config;
mod security;
mod stats;
mod store;

use pbom_github::GithubService;
use tokio_util::sync::CancellationToken;

pub use crate::service::config::ServiceConfig;
pub use crate::service::security::{SIGNATURE_PREFIX, SignatureError, SignatureVerifier};
pub use crate::service::stats::{EventStats, StatsSnapshot};
pub use crate::service::store::{RecordStore, StoreError};
use crate::pipeline::Enricher;
use crate::worker::EnrichmentDispatcher;
// Re-export error types from crate root for convenience
pub use crate::{Error, Result};

/// Tracing target for state construction.
const TRACING_TARGET: &str = "pbom_server::service";

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Debug, Clone)]
pub struct ServiceState {
    // External services:
    pub github: GithubService,

    // Internal services:
    pub verifier: SignatureVerifier,
    pub stats: EventStats,
    pub store: RecordStore,
    pub dispatcher: EnrichmentDispatcher,
}

impl ServiceState {
    /// Initializes application state from configuration.
    ///
    /// Enrichment tasks spawned through the state are cancelled together
    /// with `shutdown`.
    pub async fn new(
        service_config: &ServiceConfig,
        github: GithubService,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        service_config.validate()?;

        tokio::fs::create_dir_all(&service_config.storage_dir)
            .await
            .map_err(|e| {
                Error::file_system(format!(
                    "cannot create storage directory {}",
                    service_config.storage_dir.display()
                ))
                .with_source(e)
            })?;

        let store = RecordStore::new(&service_config.storage_dir);
        let enricher = Enricher::new(
            github.clone(),
            store.clone(),
            service_config.enrichment_timeout(),
        );

        tracing::info!(
            target: TRACING_TARGET,
            storage_dir = %service_config.storage_dir.display(),
            enrichment_timeout_secs = service_config.enrichment_timeout,
            "Service state initialized"
        );

        Ok(Self {
            github,
            verifier: SignatureVerifier::new(&service_config.webhook_secret),
            stats: EventStats::new(),
            store,
            dispatcher: EnrichmentDispatcher::new(enricher, shutdown),
        })
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

// External services:
impl_di!(github: GithubService);

// Internal services:
impl_di!(verifier: SignatureVerifier);
impl_di!(stats: EventStats);
impl_di!(store: RecordStore);
impl_di!(dispatcher: EnrichmentDispatcher);
