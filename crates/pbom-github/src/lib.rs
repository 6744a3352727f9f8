#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod service;

pub mod types;

#[cfg(feature = "reqwest")]
#[cfg_attr(docsrs, doc(cfg(feature = "reqwest")))]
pub mod reqwest;

use bytes::Bytes;
pub use pbom_core::{Error, ErrorKind, Result};
pub use service::GithubService;
pub use types::{Actor, Job, RepoRef, RunArtifact, WorkflowRun};

/// Tracing target for GitHub API operations.
pub const TRACING_TARGET: &str = "pbom_github";

/// Read access to the GitHub Actions API needed for record enrichment.
///
/// Implementations must be safe to share between concurrently running
/// enrichments.
#[async_trait::async_trait]
pub trait GithubProvider: Send + Sync {
    /// Lists workflow runs whose head commit is `head_sha`.
    async fn list_runs_by_commit(&self, repo: &RepoRef, head_sha: &str) -> Result<Vec<WorkflowRun>>;

    /// Lists the jobs of a workflow run.
    async fn list_jobs(&self, repo: &RepoRef, run_id: u64) -> Result<Vec<Job>>;

    /// Lists the artifacts uploaded by a workflow run.
    async fn list_artifacts(&self, repo: &RepoRef, run_id: u64) -> Result<Vec<RunArtifact>>;

    /// Downloads the zip archive of an artifact, following redirects.
    async fn download_artifact(&self, artifact: &RunArtifact) -> Result<Bytes>;

    /// Reads a repository file at the given ref and returns its decoded bytes.
    async fn file_content(&self, repo: &RepoRef, path: &str, git_ref: &str) -> Result<Vec<u8>>;
}
