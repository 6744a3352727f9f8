//! Fire-and-forget dispatch of enrichments.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::pipeline::{EnrichmentOutcome, Enricher, WebhookEvent};

/// Tracing target for enrichment dispatch.
const TRACING_TARGET: &str = "pbom_server::worker::enrichment";

/// Spawns one enrichment task per accepted event.
///
/// Every task gets a child of the process shutdown token, never anything
/// derived from the request that delivered the event, so it outlives the
/// response. Tasks share no record state. Clones share the task tracker, so
/// [`drain`] waits for tasks spawned through any of them.
///
/// [`drain`]: EnrichmentDispatcher::drain
#[derive(Debug, Clone)]
pub struct EnrichmentDispatcher {
    enricher: Enricher,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl EnrichmentDispatcher {
    pub fn new(enricher: Enricher, shutdown: CancellationToken) -> Self {
        Self {
            enricher,
            shutdown,
            tracker: TaskTracker::new(),
        }
    }

    /// Starts enriching `event` in the background.
    pub fn dispatch(&self, event: WebhookEvent) -> JoinHandle<Option<EnrichmentOutcome>> {
        let enricher = self.enricher.clone();
        let cancel = self.shutdown.child_token();

        tracing::debug!(
            target: TRACING_TARGET,
            run_id = event.workflow_run.id,
            repository = %event.repository.full_name,
            "Dispatching enrichment"
        );

        self.tracker.spawn(async move {
            let outcome = enricher.enrich(&event, &cancel).await;

            if outcome.is_none() {
                tracing::warn!(
                    target: TRACING_TARGET,
                    run_id = event.workflow_run.id,
                    "Enrichment dropped"
                );
            }

            outcome
        })
    }

    /// Waits up to `timeout` for every dispatched enrichment to finish.
    ///
    /// Events dispatched after this call still run but are not waited for.
    /// Returns false if some enrichment was still running at the deadline.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tracker.close();

        let pending = self.tracker.len();
        if pending == 0 {
            return true;
        }

        tracing::info!(
            target: TRACING_TARGET,
            pending,
            timeout_secs = timeout.as_secs(),
            "Waiting for running enrichments"
        );

        match tokio::time::timeout(timeout, self.tracker.wait()).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    pending = self.tracker.len(),
                    "Enrichments still running after the drain window"
                );
                false
            }
        }
    }
}
