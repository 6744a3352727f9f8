//! In-memory [`GithubProvider`] for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use pbom_core::{Error, Result};
use pbom_github::{GithubProvider, GithubService, Job, RepoRef, RunArtifact, WorkflowRun};

#[derive(Default)]
struct MockState {
    /// Runs paired with the number of listings that must happen before they show up.
    runs: Vec<(WorkflowRun, usize)>,
    jobs: HashMap<u64, Vec<Job>>,
    artifacts: HashMap<u64, Vec<RunArtifact>>,
    downloads: HashMap<String, Bytes>,
    files: HashMap<(String, String), Vec<u8>>,
    calls: HashMap<&'static str, usize>,
    next_artifact_id: u64,
}

/// In-memory GitHub Actions API.
///
/// Anything not registered answers with a not found error. Clones share
/// state, so a test can keep a handle for inspecting call counts after
/// handing the provider to the code under test.
#[derive(Clone, Default)]
pub struct MockGithubProvider {
    state: Arc<Mutex<MockState>>,
}

impl std::fmt::Debug for MockGithubProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockGithubProvider").finish_non_exhaustive()
    }
}

impl MockGithubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_call(&self, operation: &'static str) -> usize {
        let mut state = self.state();
        let count = state.calls.entry(operation).or_default();
        *count += 1;
        *count
    }

    /// Registers a run returned by commit listings.
    pub fn with_run(self, run: WorkflowRun) -> Self {
        self.with_run_after(run, 0)
    }

    /// Registers a run that only appears once `listings` commit listings
    /// have already been answered.
    pub fn with_run_after(self, run: WorkflowRun, listings: usize) -> Self {
        self.state().runs.push((run, listings));
        self
    }

    /// Registers the jobs of a run.
    pub fn with_jobs(self, run_id: u64, jobs: Vec<Job>) -> Self {
        self.state().jobs.insert(run_id, jobs);
        self
    }

    /// Registers an artifact of a run with its downloadable archive.
    pub fn with_artifact(self, run_id: u64, name: &str, archive: Bytes) -> Self {
        {
            let mut state = self.state();
            state.next_artifact_id += 1;
            let id = state.next_artifact_id;
            let url = format!("https://api.github.test/artifacts/{id}/zip");

            state.downloads.insert(url.clone(), archive.clone());
            state.artifacts.entry(run_id).or_default().push(RunArtifact {
                id,
                name: name.to_owned(),
                size_in_bytes: archive.len() as u64,
                archive_download_url: url,
            });
        }
        self
    }

    /// Registers an artifact listing entry whose download fails.
    pub fn with_broken_artifact(self, run_id: u64, name: &str) -> Self {
        {
            let mut state = self.state();
            state.next_artifact_id += 1;
            let id = state.next_artifact_id;
            state.artifacts.entry(run_id).or_default().push(RunArtifact {
                id,
                name: name.to_owned(),
                size_in_bytes: 0,
                archive_download_url: format!("https://api.github.test/artifacts/{id}/gone"),
            });
        }
        self
    }

    /// Registers a repository file readable at `git_ref`.
    pub fn with_file(self, path: &str, git_ref: &str, content: impl Into<Vec<u8>>) -> Self {
        self.state()
            .files
            .insert((path.to_owned(), git_ref.to_owned()), content.into());
        self
    }

    /// Returns how many times `operation` was called.
    pub fn calls(&self, operation: &str) -> usize {
        self.state().calls.get(operation).copied().unwrap_or(0)
    }

    /// Wraps a clone of this provider into a [`GithubService`].
    pub fn service(&self) -> GithubService {
        GithubService::new(self.clone())
    }
}

#[async_trait::async_trait]
impl GithubProvider for MockGithubProvider {
    async fn list_runs_by_commit(&self, _repo: &RepoRef, head_sha: &str) -> Result<Vec<WorkflowRun>> {
        let listing = self.record_call("list_runs_by_commit");
        let runs = self
            .state()
            .runs
            .iter()
            .filter(|(run, after)| listing > *after && run.head_sha == head_sha)
            .map(|(run, _)| run.clone())
            .collect();
        Ok(runs)
    }

    async fn list_jobs(&self, _repo: &RepoRef, run_id: u64) -> Result<Vec<Job>> {
        self.record_call("list_jobs");
        self.state()
            .jobs
            .get(&run_id)
            .cloned()
            .ok_or_else(|| Error::not_found().with_message(format!("no jobs for run {run_id}")))
    }

    async fn list_artifacts(&self, _repo: &RepoRef, run_id: u64) -> Result<Vec<RunArtifact>> {
        self.record_call("list_artifacts");
        Ok(self
            .state()
            .artifacts
            .get(&run_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn download_artifact(&self, artifact: &RunArtifact) -> Result<Bytes> {
        self.record_call("download_artifact");
        self.state()
            .downloads
            .get(&artifact.archive_download_url)
            .cloned()
            .ok_or_else(|| {
                Error::not_found().with_message(format!("no archive for {}", artifact.name))
            })
    }

    async fn file_content(&self, _repo: &RepoRef, path: &str, git_ref: &str) -> Result<Vec<u8>> {
        self.record_call("file_content");
        self.state()
            .files
            .get(&(path.to_owned(), git_ref.to_owned()))
            .cloned()
            .ok_or_else(|| Error::not_found().with_message(format!("no file {path} at {git_ref}")))
    }
}
