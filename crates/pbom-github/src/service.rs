//! GitHub service wrapper with observability.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;

use crate::{GithubProvider, Job, RepoRef, Result, RunArtifact, TRACING_TARGET, WorkflowRun};

/// GitHub service wrapper with observability.
///
/// This wrapper adds structured logging to any [`GithubProvider`]
/// implementation. The inner provider is wrapped in `Arc` for cheap cloning.
#[derive(Clone)]
pub struct GithubService {
    inner: Arc<dyn GithubProvider>,
}

impl fmt::Debug for GithubService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubService").finish_non_exhaustive()
    }
}

impl GithubService {
    /// Create a new GitHub service wrapper.
    pub fn new<P>(provider: P) -> Self
    where
        P: GithubProvider + 'static,
    {
        Self {
            inner: Arc::new(provider),
        }
    }

    pub async fn list_runs_by_commit(
        &self,
        repo: &RepoRef,
        head_sha: &str,
    ) -> Result<Vec<WorkflowRun>> {
        let started_at = Instant::now();
        let result = self.inner.list_runs_by_commit(repo, head_sha).await;
        log_outcome(&result, "list_runs_by_commit", repo, started_at, Vec::len);
        result
    }

    pub async fn list_jobs(&self, repo: &RepoRef, run_id: u64) -> Result<Vec<Job>> {
        let started_at = Instant::now();
        let result = self.inner.list_jobs(repo, run_id).await;
        log_outcome(&result, "list_jobs", repo, started_at, Vec::len);
        result
    }

    pub async fn list_artifacts(&self, repo: &RepoRef, run_id: u64) -> Result<Vec<RunArtifact>> {
        let started_at = Instant::now();
        let result = self.inner.list_artifacts(repo, run_id).await;
        log_outcome(&result, "list_artifacts", repo, started_at, Vec::len);
        result
    }

    /// Downloads an artifact archive.
    pub async fn download_artifact(&self, artifact: &RunArtifact) -> Result<Bytes> {
        let started_at = Instant::now();

        tracing::debug!(
            target: TRACING_TARGET,
            artifact_id = artifact.id,
            artifact = %artifact.name,
            "Downloading artifact"
        );

        let result = self.inner.download_artifact(artifact).await;
        let elapsed = started_at.elapsed();

        match &result {
            Ok(bytes) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    artifact = %artifact.name,
                    size = bytes.len(),
                    elapsed_ms = elapsed.as_millis(),
                    "Artifact downloaded"
                );
            }
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    artifact = %artifact.name,
                    error = %error,
                    elapsed_ms = elapsed.as_millis(),
                    "Artifact download failed"
                );
            }
        }

        result
    }

    /// Reads a repository file at `git_ref`.
    pub async fn file_content(&self, repo: &RepoRef, path: &str, git_ref: &str) -> Result<Vec<u8>> {
        let started_at = Instant::now();
        let result = self.inner.file_content(repo, path, git_ref).await;
        log_outcome(&result, "file_content", repo, started_at, Vec::len);
        result
    }
}

fn log_outcome<T>(
    result: &Result<T>,
    operation: &'static str,
    repo: &RepoRef,
    started_at: Instant,
    size: impl Fn(&T) -> usize,
) {
    let elapsed = started_at.elapsed();

    match result {
        Ok(value) => {
            tracing::debug!(
                target: TRACING_TARGET,
                operation,
                repository = %repo,
                count = size(value),
                elapsed_ms = elapsed.as_millis(),
                "GitHub request completed"
            );
        }
        Err(error) => {
            tracing::warn!(
                target: TRACING_TARGET,
                operation,
                repository = %repo,
                error = %error,
                elapsed_ms = elapsed.as_millis(),
                "GitHub request failed"
            );
        }
    }
}
