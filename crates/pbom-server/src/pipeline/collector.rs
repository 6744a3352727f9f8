//! Correlation of a run with the skeleton record of its collector run.
//!
//! The collector workflow runs alongside the build for the same commit and
//! uploads a skeleton record as the `pbom-{run_id}` artifact. It may finish
//! after the build that triggered enrichment, so resolution polls on a fixed
//! schedule until the skeleton shows up, the deadline passes, or shutdown
//! is requested.

use std::time::Duration;

use pbom_core::PipelineRecord;
use pbom_github::{GithubService, RepoRef, RunArtifact, WorkflowRun};
use tokio::time::{Instant, sleep, sleep_until, timeout_at};
use tokio_util::sync::CancellationToken;

use super::archive::{ArchiveError, extract_json};

/// Tracing target for collector resolution.
const TRACING_TARGET: &str = "pbom_server::pipeline::collector";

/// Display name of the workflow that uploads skeleton records.
pub const COLLECTOR_WORKFLOW: &str = "PBOM Collector";

/// Returns the artifact name a collector run uploads its skeleton under.
pub fn skeleton_artifact_name(collector_run_id: u64) -> String {
    format!("pbom-{collector_run_id}")
}

/// Errors raised while resolving a skeleton record.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("no successful {COLLECTOR_WORKFLOW} run for commit {0}")]
    NoCollectorRun(String),
    #[error("collector run {run_id} has no artifact named {name}")]
    MissingArtifact { run_id: u64, name: String },
    #[error("GitHub request failed: {0}")]
    Github(#[from] pbom_core::Error),
    #[error("skeleton artifact is unusable: {0}")]
    Archive(#[from] ArchiveError),
    #[error("collector resolution deadline elapsed")]
    DeadlineElapsed,
    #[error("collector resolution cancelled by shutdown")]
    Cancelled,
    #[error("retry schedule has no attempts")]
    Exhausted,
}

/// Delays before each resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySchedule {
    delays: Vec<Duration>,
}

impl Default for RetrySchedule {
    /// Immediately, then after 10s, 30s and 60s.
    fn default() -> Self {
        Self::new([0, 10, 30, 60].map(Duration::from_secs))
    }
}

impl RetrySchedule {
    pub fn new(delays: impl IntoIterator<Item = Duration>) -> Self {
        Self {
            delays: delays.into_iter().collect(),
        }
    }

    /// Returns the number of attempts.
    pub fn attempts(&self) -> usize {
        self.delays.len()
    }

    /// Returns the delay before `attempt` (zero based).
    pub fn delay(&self, attempt: usize) -> Option<Duration> {
        self.delays.get(attempt).copied()
    }
}

/// Progress of one resolution.
#[derive(Debug)]
enum ResolutionState {
    Waiting { attempt: usize },
    Attempting { attempt: usize },
    Resolved(Box<PipelineRecord>),
    Failed(ResolveError),
}

/// Finds and decodes the skeleton record of a commit's collector run.
#[derive(Debug, Clone)]
pub struct CollectorResolver {
    github: GithubService,
    schedule: RetrySchedule,
}

impl CollectorResolver {
    pub fn new(github: GithubService) -> Self {
        Self {
            github,
            schedule: RetrySchedule::default(),
        }
    }

    /// Replaces the default retry schedule.
    #[must_use]
    pub fn with_schedule(mut self, schedule: RetrySchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Resolves the skeleton record for `head_sha`, giving up at `deadline`
    /// or once `cancel` fires.
    ///
    /// Errors of non-final attempts are logged and retried. Only the last
    /// attempt's error is returned.
    pub async fn resolve(
        &self,
        repo: &RepoRef,
        head_sha: &str,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<PipelineRecord, ResolveError> {
        let mut state = if self.schedule.attempts() == 0 {
            ResolutionState::Failed(ResolveError::Exhausted)
        } else {
            ResolutionState::Waiting { attempt: 0 }
        };

        loop {
            state = match state {
                ResolutionState::Waiting { attempt } => match self.wait(attempt, deadline, cancel).await {
                    Ok(()) => ResolutionState::Attempting { attempt },
                    Err(error) => ResolutionState::Failed(error),
                },
                ResolutionState::Attempting { attempt } => {
                    let outcome = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => Err(ResolveError::Cancelled),
                        result = timeout_at(deadline, self.attempt(repo, head_sha)) => {
                            result.unwrap_or(Err(ResolveError::DeadlineElapsed))
                        }
                    };

                    match outcome {
                        Ok(record) => ResolutionState::Resolved(Box::new(record)),
                        Err(error @ (ResolveError::Cancelled | ResolveError::DeadlineElapsed)) => {
                            ResolutionState::Failed(error)
                        }
                        Err(error) if attempt + 1 < self.schedule.attempts() => {
                            tracing::debug!(
                                target: TRACING_TARGET,
                                attempt = attempt + 1,
                                error = %error,
                                "Collector resolution attempt failed"
                            );
                            ResolutionState::Waiting {
                                attempt: attempt + 1,
                            }
                        }
                        Err(error) => ResolutionState::Failed(error),
                    }
                }
                ResolutionState::Resolved(record) => return Ok(*record),
                ResolutionState::Failed(error) => return Err(error),
            };
        }
    }

    async fn wait(
        &self,
        attempt: usize,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<(), ResolveError> {
        let delay = self.schedule.delay(attempt).unwrap_or_default();
        if delay.is_zero() {
            return Ok(());
        }

        tracing::info!(
            target: TRACING_TARGET,
            attempt = attempt + 1,
            delay_secs = delay.as_secs(),
            "Waiting for collector run to complete"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ResolveError::Cancelled),
            _ = sleep_until(deadline) => Err(ResolveError::DeadlineElapsed),
            _ = sleep(delay) => Ok(()),
        }
    }

    async fn attempt(&self, repo: &RepoRef, head_sha: &str) -> Result<PipelineRecord, ResolveError> {
        let runs = self.github.list_runs_by_commit(repo, head_sha).await?;
        let collector = find_collector_run(runs)
            .ok_or_else(|| ResolveError::NoCollectorRun(head_sha.to_owned()))?;

        let name = skeleton_artifact_name(collector.id);
        let artifacts = self.github.list_artifacts(repo, collector.id).await?;
        let artifact = find_artifact(artifacts, &name).ok_or(ResolveError::MissingArtifact {
            run_id: collector.id,
            name,
        })?;

        let archive = self.github.download_artifact(&artifact).await?;
        let record = extract_json::<PipelineRecord>(&archive)?;

        tracing::info!(
            target: TRACING_TARGET,
            collector_run_id = collector.id,
            record_id = %record.id,
            "Skeleton record resolved"
        );

        Ok(record)
    }
}

fn find_collector_run(runs: Vec<WorkflowRun>) -> Option<WorkflowRun> {
    runs.into_iter()
        .find(|run| run.name == COLLECTOR_WORKFLOW && run.succeeded())
}

fn find_artifact(artifacts: Vec<RunArtifact>, name: &str) -> Option<RunArtifact> {
    artifacts.into_iter().find(|artifact| artifact.name == name)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use pbom_core::{Build, Source};
    use pbom_test::{MockGithubProvider, json_archive};

    use super::*;

    const SHA: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    fn repo() -> RepoRef {
        RepoRef::new("acme", "widget")
    }

    fn collector_run(id: u64, conclusion: &str) -> WorkflowRun {
        WorkflowRun {
            id,
            name: COLLECTOR_WORKFLOW.into(),
            head_sha: SHA.into(),
            status: "completed".into(),
            conclusion: Some(conclusion.into()),
            ..WorkflowRun::default()
        }
    }

    fn skeleton() -> Bytes {
        let record = PipelineRecord::new(
            "skeleton-1",
            Source {
                repository: "acme/widget".into(),
                commit_sha: SHA.into(),
                ..Source::default()
            },
            Build {
                workflow_run_id: "7".into(),
                ..Build::default()
            },
        );
        json_archive("pbom.json", &record).unwrap()
    }

    fn resolver(mock: &MockGithubProvider) -> CollectorResolver {
        CollectorResolver::new(mock.service())
    }

    fn two_minutes() -> Instant {
        Instant::now() + Duration::from_secs(120)
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_on_first_attempt() {
        let mock = MockGithubProvider::new()
            .with_run(collector_run(7, "success"))
            .with_artifact(7, "pbom-7", skeleton());

        let record = resolver(&mock)
            .resolve(&repo(), SHA, two_minutes(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(record.id, "skeleton-1");
        assert_eq!(mock.calls("list_runs_by_commit"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn late_collector_is_found_by_retry() {
        let mock = MockGithubProvider::new()
            .with_run_after(collector_run(7, "success"), 2)
            .with_artifact(7, "pbom-7", skeleton());

        let started = Instant::now();
        let record = resolver(&mock)
            .resolve(&repo(), SHA, two_minutes(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(record.id, "skeleton-1");
        assert_eq!(mock.calls("list_runs_by_commit"), 3);
        assert!(started.elapsed() >= Duration::from_secs(40));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_collector_exhausts_schedule() {
        let mock = MockGithubProvider::new();

        let started = Instant::now();
        let error = resolver(&mock)
            .resolve(&repo(), SHA, two_minutes(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(error, ResolveError::NoCollectorRun(ref sha) if sha == SHA));
        assert_eq!(mock.calls("list_runs_by_commit"), 4);
        assert!(started.elapsed() >= Duration::from_secs(100));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_collector_runs_are_ignored() {
        let mock = MockGithubProvider::new()
            .with_run(collector_run(7, "failure"))
            .with_artifact(7, "pbom-7", skeleton());

        let error = resolver(&mock)
            .resolve(&repo(), SHA, two_minutes(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(error, ResolveError::NoCollectorRun(_)));
        assert_eq!(mock.calls("list_artifacts"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_skeleton_artifact_is_reported() {
        let mock = MockGithubProvider::new()
            .with_run(collector_run(7, "success"))
            .with_artifact(7, "logs", skeleton());

        let error = resolver(&mock)
            .resolve(&repo(), SHA, two_minutes(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(error, ResolveError::MissingArtifact { run_id: 7, .. }));
        assert_eq!(mock.calls("list_artifacts"), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_stops_retries() {
        let mock = MockGithubProvider::new();
        let deadline = Instant::now() + Duration::from_secs(15);

        let error = resolver(&mock)
            .resolve(&repo(), SHA, deadline, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(error, ResolveError::DeadlineElapsed));
        assert_eq!(mock.calls("list_runs_by_commit"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_resolution() {
        let mock = MockGithubProvider::new();
        let cancel = CancellationToken::new();
        let resolver = resolver(&mock);
        let task_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            resolver
                .resolve(&repo(), SHA, two_minutes(), &task_cancel)
                .await
        });

        tokio::time::sleep(Duration::from_secs(5)).await;
        cancel.cancel();

        let error = handle.await.unwrap().unwrap_err();
        assert!(matches!(error, ResolveError::Cancelled));
        assert_eq!(mock.calls("list_runs_by_commit"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_schedule_is_honored() {
        let mock = MockGithubProvider::new();
        let resolver = resolver(&mock).with_schedule(RetrySchedule::new([Duration::ZERO]));

        let error = resolver
            .resolve(&repo(), SHA, two_minutes(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(error, ResolveError::NoCollectorRun(_)));
        assert_eq!(mock.calls("list_runs_by_commit"), 1);
    }

    #[tokio::test]
    async fn empty_schedule_is_exhausted() {
        let mock = MockGithubProvider::new();
        let resolver = resolver(&mock).with_schedule(RetrySchedule::new(Vec::<Duration>::new()));

        let error = resolver
            .resolve(&repo(), SHA, two_minutes(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(error, ResolveError::Exhausted));
    }

    #[test]
    fn skeleton_artifact_follows_convention() {
        assert_eq!(skeleton_artifact_name(99), "pbom-99");
    }
}
