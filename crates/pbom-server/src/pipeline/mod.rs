//! Enrichment pipeline for completed workflow runs.
//!
//! An accepted [`WebhookEvent`] flows through the [`Enricher`]:
//!
//! 1. the [`CollectorResolver`] polls for the skeleton record uploaded by the
//!    collector run of the same commit, or a fallback record is synthesized;
//! 2. runner and timing data come from the run's jobs;
//! 3. secret references come from the workflow definition at the head commit;
//! 4. container images come from `docker-metadata-*` artifacts;
//! 5. the record is written through the [`RecordStore`].
//!
//! [`RecordStore`]: crate::service::RecordStore

mod archive;
mod collector;
mod enricher;
mod event;
mod runner;
mod secrets;

pub use archive::{ArchiveError, DOCKER_METADATA_PREFIX, DockerMetadata, extract_json};
pub use collector::{
    COLLECTOR_WORKFLOW, CollectorResolver, ResolveError, RetrySchedule, skeleton_artifact_name,
};
pub use enricher::{EnrichmentOutcome, EnrichmentStage, Enricher, fallback_record};
pub use event::{
    AccountPayload, COMPLETED_ACTION, RepositoryPayload, RunPayload, WORKFLOW_RUN_EVENT,
    WebhookEvent,
};
pub use runner::{RunnerArch, RunnerOs, infer_runner, job_window};
pub use secrets::scan_secrets;
