//! Merging of skeleton, event and API data into the final record.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use jiff::Timestamp;
use pbom_core::{Artifact, Build, PipelineRecord, Source};
use pbom_github::{GithubService, RepoRef};
use strum::{AsRefStr, Display};
use tokio::time::{Instant, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::archive::{DockerMetadata, extract_json, is_docker_metadata};
use super::collector::CollectorResolver;
use super::event::WebhookEvent;
use super::runner::{infer_runner, job_window};
use super::secrets::scan_secrets;
use crate::service::RecordStore;

/// Tracing target for enrichment.
const TRACING_TARGET: &str = "pbom_server::pipeline::enricher";

/// Steps of one enrichment, in execution order.
///
/// A failed skeleton resolution continues at [`EnrichingRunner`] with a
/// fallback record.
///
/// [`EnrichingRunner`]: EnrichmentStage::EnrichingRunner
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum EnrichmentStage {
    Received,
    ResolvingSkeleton,
    EnrichingRunner,
    EnrichingSecrets,
    EnrichingArtifacts,
    Persisting,
    Done,
}

/// Result of one enrichment.
#[derive(Debug, Clone)]
pub struct EnrichmentOutcome {
    pub record: PipelineRecord,
    /// True when the record was synthesized from the event.
    pub fallback: bool,
    /// Location of the persisted record, `None` if writing failed.
    pub path: Option<PathBuf>,
}

/// Builds and persists the record of a completed run.
#[derive(Debug, Clone)]
pub struct Enricher {
    github: GithubService,
    resolver: CollectorResolver,
    store: RecordStore,
    timeout: Duration,
}

impl Enricher {
    pub fn new(github: GithubService, store: RecordStore, timeout: Duration) -> Self {
        Self {
            resolver: CollectorResolver::new(github.clone()),
            github,
            store,
            timeout,
        }
    }

    /// Replaces the collector resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: CollectorResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Runs every enrichment step for `event`.
    ///
    /// Remote failures degrade the record instead of aborting. All remote
    /// calls share one deadline starting now. Cancelling `cancel` stops
    /// skeleton resolution, the remaining steps still run. Returns `None` if
    /// the event does not identify its repository.
    pub async fn enrich(
        &self,
        event: &WebhookEvent,
        cancel: &CancellationToken,
    ) -> Option<EnrichmentOutcome> {
        let repo = match event.repo() {
            Ok(repo) => repo,
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    run_id = event.workflow_run.id,
                    error = %error,
                    "Event does not identify its repository"
                );
                return None;
            }
        };

        let head_sha = &event.workflow_run.head_sha;
        let span = tracing::info_span!(
            target: TRACING_TARGET,
            "enrichment",
            repository = %repo,
            run_id = event.workflow_run.id,
            sha = head_sha.get(..8).unwrap_or(head_sha),
        );

        Some(self.run(event, &repo, cancel).instrument(span).await)
    }

    async fn run(
        &self,
        event: &WebhookEvent,
        repo: &RepoRef,
        cancel: &CancellationToken,
    ) -> EnrichmentOutcome {
        let deadline = Instant::now() + self.timeout;
        let run = &event.workflow_run;
        stage(EnrichmentStage::Received);

        stage(EnrichmentStage::ResolvingSkeleton);
        let resolved = self
            .resolver
            .resolve(repo, &run.head_sha, deadline, cancel)
            .await;
        let (mut record, fallback) = match resolved {
            Ok(record) => (record, false),
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    error = %error,
                    "Skeleton record unavailable, using fallback"
                );
                (fallback_record(event, repo), true)
            }
        };

        stage(EnrichmentStage::EnrichingRunner);
        match within(deadline, self.github.list_jobs(repo, run.id)).await {
            Ok(jobs) => {
                if let Some(runner) = infer_runner(&jobs) {
                    tracing::info!(
                        target: TRACING_TARGET,
                        os = runner.os.as_deref().unwrap_or_default(),
                        arch = runner.arch.as_deref().unwrap_or_default(),
                        self_hosted = runner.self_hosted,
                        "Runner inferred"
                    );
                    record.build.runner = Some(runner);
                }

                let (started_at, completed_at) = job_window(&jobs);
                if started_at.is_some() {
                    record.build.started_at = started_at;
                }
                if completed_at.is_some() {
                    record.build.completed_at = completed_at;
                }
            }
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    error = %error,
                    "Failed to fetch run jobs"
                );
            }
        }

        record.build.status = run.conclusion.clone().unwrap_or_default();
        record.build.workflow_name = run.name.clone();
        record.build.workflow_file = run.path.clone();

        stage(EnrichmentStage::EnrichingSecrets);
        if let Some(path) = event.workflow_path() {
            match within(deadline, self.github.file_content(repo, path, &run.head_sha)).await {
                Ok(content) => {
                    let secrets = scan_secrets(&String::from_utf8_lossy(&content));
                    if !secrets.is_empty() {
                        tracing::info!(
                            target: TRACING_TARGET,
                            count = secrets.len(),
                            secrets = %secrets.join(","),
                            "Secret references found"
                        );
                        record.build.secrets_accessed = secrets;
                    }
                }
                Err(error) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        path,
                        error = %error,
                        "Failed to fetch workflow definition"
                    );
                }
            }
        }

        stage(EnrichmentStage::EnrichingArtifacts);
        let images = self.image_artifacts(repo, run.id, deadline).await;
        if !images.is_empty() {
            tracing::info!(
                target: TRACING_TARGET,
                count = images.len(),
                "Container image artifacts found"
            );
            record.artifacts.extend(images);
        }

        stage(EnrichmentStage::Persisting);
        if let Err(violations) = record.validate() {
            tracing::warn!(
                target: TRACING_TARGET,
                violations = %violations,
                "Enriched record is incomplete"
            );
        }

        let path = match self.store.save(repo, run.id, &record).await {
            Ok(path) => {
                tracing::info!(
                    target: TRACING_TARGET,
                    path = %path.display(),
                    fallback,
                    artifacts = record.artifacts.len(),
                    secrets = record.build.secrets_accessed.len(),
                    "Enriched record stored"
                );
                Some(path)
            }
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %error,
                    "Failed to store enriched record"
                );
                None
            }
        };

        stage(EnrichmentStage::Done);
        EnrichmentOutcome {
            record,
            fallback,
            path,
        }
    }

    /// Collects container images described by `docker-metadata-*` artifacts.
    async fn image_artifacts(&self, repo: &RepoRef, run_id: u64, deadline: Instant) -> Vec<Artifact> {
        let artifacts = match within(deadline, self.github.list_artifacts(repo, run_id)).await {
            Ok(artifacts) => artifacts,
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    error = %error,
                    "Failed to list run artifacts"
                );
                return Vec::new();
            }
        };

        let mut images = Vec::new();
        for artifact in artifacts.iter().filter(|a| is_docker_metadata(&a.name)) {
            let archive = match within(deadline, self.github.download_artifact(artifact)).await {
                Ok(archive) => archive,
                Err(error) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        artifact = %artifact.name,
                        error = %error,
                        "Skipping image metadata artifact"
                    );
                    continue;
                }
            };

            match extract_json::<DockerMetadata>(&archive) {
                Ok(metadata) => images.push(metadata.into_artifact(repo.name.as_str())),
                Err(error) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        artifact = %artifact.name,
                        error = %error,
                        "Skipping image metadata artifact"
                    );
                }
            }
        }

        images
    }
}

fn stage(stage: EnrichmentStage) {
    tracing::debug!(target: TRACING_TARGET, stage = stage.as_ref(), "Enrichment stage");
}

async fn within<T>(
    deadline: Instant,
    future: impl Future<Output = pbom_core::Result<T>>,
) -> pbom_core::Result<T> {
    timeout_at(deadline, future).await.unwrap_or_else(|_| {
        Err(pbom_core::Error::timeout().with_message("enrichment deadline elapsed"))
    })
}

/// Synthesizes a record from the event alone.
pub fn fallback_record(event: &WebhookEvent, repo: &RepoRef) -> PipelineRecord {
    let now = Timestamp::now();
    let run = &event.workflow_run;
    let actor = event.actor_login().map(str::to_owned);

    let repository = if event.repository.full_name.is_empty() {
        repo.to_string()
    } else {
        event.repository.full_name.clone()
    };

    let source = Source {
        repository,
        commit_sha: run.head_sha.clone(),
        branch: run.head_branch.clone(),
        git_ref: None,
        author: actor.clone(),
    };

    let build = Build {
        workflow_run_id: run.id.to_string(),
        workflow_name: run.name.clone(),
        workflow_file: run.path.clone(),
        trigger: run.event.clone(),
        actor: actor.unwrap_or_default(),
        status: run.conclusion.clone().unwrap_or_default(),
        started_at: Some(now),
        ..Build::default()
    };

    let mut record = PipelineRecord::new(format!("fallback-{}", run.id), source, build);
    record.timestamp = now;
    record
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use pbom_core::{CONTAINER_IMAGE, VERSION};
    use pbom_github::{Job, WorkflowRun};
    use pbom_test::{MockGithubProvider, json_archive, zip_archive};
    use tempfile::TempDir;

    use super::*;
    use crate::pipeline::collector::{COLLECTOR_WORKFLOW, RetrySchedule};
    use crate::pipeline::event::{AccountPayload, RepositoryPayload, RunPayload};

    const SHA: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const DIGEST: &str = "sha256:2222222222222222222222222222222222222222222222222222222222222222";

    fn event() -> WebhookEvent {
        WebhookEvent {
            action: "completed".into(),
            workflow_run: RunPayload {
                id: 42,
                name: "CI".into(),
                head_sha: SHA.into(),
                head_branch: Some("main".into()),
                path: Some(".github/workflows/ci.yml".into()),
                event: Some("push".into()),
                conclusion: Some("success".into()),
                actor: Some(AccountPayload {
                    login: "octocat".into(),
                }),
            },
            repository: RepositoryPayload {
                name: "widget".into(),
                full_name: "acme/widget".into(),
                owner: AccountPayload {
                    login: "acme".into(),
                },
            },
        }
    }

    fn enricher(mock: &MockGithubProvider, dir: &TempDir) -> Enricher {
        Enricher::new(
            mock.service(),
            RecordStore::new(dir.path()),
            Duration::from_secs(120),
        )
    }

    fn ts(value: &str) -> Timestamp {
        value.parse().unwrap()
    }

    fn never() -> CancellationToken {
        CancellationToken::new()
    }

    fn skeleton() -> PipelineRecord {
        let mut record = PipelineRecord::new(
            "skeleton-7",
            Source {
                repository: "acme/widget".into(),
                commit_sha: SHA.into(),
                ..Source::default()
            },
            Build {
                workflow_run_id: "42".into(),
                workflow_name: "PBOM Collector".into(),
                actor: "octocat".into(),
                secrets_accessed: vec!["OLD_SECRET".into()],
                ..Build::default()
            },
        );
        record.artifacts.push(Artifact {
            name: "widget.tar.gz".into(),
            artifact_type: "archive".into(),
            ..Artifact::default()
        });
        record
    }

    fn with_skeleton(mock: MockGithubProvider) -> MockGithubProvider {
        mock.with_run(WorkflowRun {
            id: 7,
            name: COLLECTOR_WORKFLOW.into(),
            head_sha: SHA.into(),
            conclusion: Some("success".into()),
            ..WorkflowRun::default()
        })
        .with_artifact(7, "pbom-7", json_archive("pbom.json", &skeleton()).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_record_is_persisted() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let mock = MockGithubProvider::new();

        let outcome = enricher(&mock, &dir).enrich(&event(), &never()).await.unwrap();

        assert!(outcome.fallback);
        let path = outcome.path.unwrap();
        assert_eq!(path, dir.path().join("acme_widget_42.pbom.json"));

        let saved: PipelineRecord = serde_json::from_slice(&std::fs::read(&path)?)?;
        assert_eq!(saved.id, "fallback-42");
        assert_eq!(saved.pbom_version, VERSION);
        assert_eq!(saved.source.commit_sha, SHA);
        assert_eq!(saved.source.branch.as_deref(), Some("main"));
        assert_eq!(saved.build.workflow_run_id, "42");
        assert_eq!(saved.build.trigger.as_deref(), Some("push"));
        assert_eq!(saved.build.status, "success");
        assert!(saved.build.started_at.is_some());
        assert!(saved.artifacts.is_empty());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn skeleton_is_enriched() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let metadata = DockerMetadata {
            image: "ghcr.io/acme/widget".into(),
            digest: DIGEST.into(),
            tags: "ghcr.io/acme/widget:1.0\nghcr.io/acme/widget:latest".into(),
        };
        let mock = with_skeleton(MockGithubProvider::new())
            .with_jobs(
                42,
                vec![
                    Job {
                        labels: vec!["self-hosted".into(), "linux".into(), "arm64".into()],
                        started_at: Some(ts("2025-03-01T10:02:00Z")),
                        completed_at: Some(ts("2025-03-01T10:05:00Z")),
                        ..Job::default()
                    },
                    Job {
                        started_at: Some(ts("2025-03-01T10:00:00Z")),
                        completed_at: Some(ts("2025-03-01T10:08:00Z")),
                        ..Job::default()
                    },
                ],
            )
            .with_file(
                ".github/workflows/ci.yml",
                SHA,
                "env:\n  A: ${{ secrets.NPM_TOKEN }}\n  B: ${{ secrets.GITHUB_TOKEN }}\n",
            )
            .with_artifact(42, "docker-metadata-42", json_archive("meta.json", &metadata)?)
            .with_broken_artifact(42, "docker-metadata-broken")
            .with_artifact(42, "coverage", Bytes::from_static(b"not inspected"));

        let outcome = enricher(&mock, &dir).enrich(&event(), &never()).await.unwrap();
        let record = outcome.record;

        assert!(!outcome.fallback);
        assert_eq!(record.id, "skeleton-7");

        let runner = record.build.runner.unwrap();
        assert_eq!(runner.os.as_deref(), Some("Linux"));
        assert_eq!(runner.arch.as_deref(), Some("ARM64"));
        assert!(runner.self_hosted);
        assert_eq!(record.build.started_at, Some(ts("2025-03-01T10:00:00Z")));
        assert_eq!(record.build.completed_at, Some(ts("2025-03-01T10:08:00Z")));

        assert_eq!(record.build.status, "success");
        assert_eq!(record.build.workflow_name, "CI");
        assert_eq!(
            record.build.workflow_file.as_deref(),
            Some(".github/workflows/ci.yml")
        );
        assert_eq!(record.build.secrets_accessed, vec!["NPM_TOKEN"]);

        assert_eq!(record.artifacts.len(), 2);
        assert_eq!(record.artifacts[0].name, "widget.tar.gz");
        let image = &record.artifacts[1];
        assert_eq!(image.name, "widget");
        assert_eq!(image.artifact_type, CONTAINER_IMAGE);
        assert_eq!(image.digest, DIGEST);
        assert_eq!(image.tags.len(), 2);

        assert_eq!(mock.calls("download_artifact"), 3);
        assert!(outcome.path.is_some());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn undecodable_image_metadata_is_skipped() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let metadata = DockerMetadata {
            image: "ghcr.io/acme/widget".into(),
            digest: DIGEST.into(),
            tags: "ghcr.io/acme/widget:1.0".into(),
        };
        let mock = with_skeleton(MockGithubProvider::new())
            .with_artifact(
                42,
                "docker-metadata-bad",
                zip_archive(&[("metadata.json", &b"{not json"[..])])?,
            )
            .with_artifact(42, "docker-metadata-good", json_archive("meta.json", &metadata)?);

        let outcome = enricher(&mock, &dir).enrich(&event(), &never()).await.unwrap();
        let record = outcome.record;

        assert!(!outcome.fallback);
        assert_eq!(mock.calls("download_artifact"), 3);
        assert_eq!(record.artifacts.len(), 2);
        assert_eq!(record.artifacts[1].artifact_type, CONTAINER_IMAGE);
        assert_eq!(record.artifacts[1].digest, DIGEST);
        assert!(outcome.path.is_some());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn empty_scan_keeps_existing_secrets() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let mock = with_skeleton(MockGithubProvider::new()).with_file(
            ".github/workflows/ci.yml",
            SHA,
            "jobs: {}\n",
        );

        let outcome = enricher(&mock, &dir).enrich(&event(), &never()).await.unwrap();

        assert_eq!(outcome.record.build.secrets_accessed, vec!["OLD_SECRET"]);
        assert!(outcome.record.build.runner.is_none());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn missing_workflow_path_skips_secret_scan() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let mock = MockGithubProvider::new();
        let single_attempt = CollectorResolver::new(mock.service())
            .with_schedule(RetrySchedule::new([Duration::ZERO]));
        let mut event = event();
        event.workflow_run.path = None;

        let outcome = enricher(&mock, &dir)
            .with_resolver(single_attempt)
            .enrich(&event, &never())
            .await
            .unwrap();

        assert_eq!(mock.calls("file_content"), 0);
        assert_eq!(mock.calls("list_runs_by_commit"), 1);
        assert!(outcome.record.build.workflow_file.is_none());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_falls_back_and_still_persists() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let mock = MockGithubProvider::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = enricher(&mock, &dir).enrich(&event(), &cancel).await.unwrap();

        assert!(outcome.fallback);
        assert!(outcome.path.is_some());
        assert_eq!(mock.calls("list_runs_by_commit"), 0);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn storage_failure_is_not_fatal() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file")?;

        let mock = MockGithubProvider::new();
        let enricher = Enricher::new(
            mock.service(),
            RecordStore::new(&blocker),
            Duration::from_secs(120),
        );

        let outcome = enricher.enrich(&event(), &never()).await.unwrap();
        assert!(outcome.path.is_none());
        assert_eq!(outcome.record.id, "fallback-42");
        Ok(())
    }

    #[tokio::test]
    async fn event_without_repository_is_dropped() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let mock = MockGithubProvider::new();
        let event = WebhookEvent {
            repository: RepositoryPayload::default(),
            ..event()
        };

        assert!(enricher(&mock, &dir).enrich(&event, &never()).await.is_none());
        assert_eq!(mock.calls("list_runs_by_commit"), 0);
        Ok(())
    }

    #[test]
    fn fallback_uses_event_identity() {
        let record = fallback_record(&event(), &RepoRef::new("acme", "widget"));

        assert_eq!(record.id, "fallback-42");
        assert_eq!(record.source.repository, "acme/widget");
        assert_eq!(record.source.author.as_deref(), Some("octocat"));
        assert_eq!(record.build.actor, "octocat");
        assert_eq!(record.build.started_at, Some(record.timestamp));
        assert!(record.validate().is_ok());
    }
}
