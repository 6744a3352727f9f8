//! Reqwest-based HTTP client for the GitHub REST API.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::{Error, ReqwestConfig, TRACING_TARGET};
use crate::{GithubProvider, GithubService, Job, RepoRef, RunArtifact, WorkflowRun};

const GITHUB_JSON: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";
const PER_PAGE: &str = "100";

/// Inner client that holds the HTTP client and configuration.
struct ReqwestClientInner {
    http: Client,
    base_url: Url,
    config: ReqwestConfig,
}

/// Authenticated client for the GitHub REST API.
///
/// This client implements the [`GithubProvider`] trait. Every request carries
/// the bearer token and the GitHub JSON media type. Redirects are followed,
/// which artifact downloads rely on; the bearer token is dropped when a
/// redirect leaves the API host.
#[derive(Clone)]
pub struct ReqwestClient {
    inner: Arc<ReqwestClientInner>,
}

impl std::fmt::Debug for ReqwestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestClient")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct WorkflowRunsPage {
    #[serde(default)]
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Deserialize)]
struct JobsPage {
    #[serde(default)]
    jobs: Vec<Job>,
}

#[derive(Deserialize)]
struct ArtifactsPage {
    #[serde(default)]
    artifacts: Vec<RunArtifact>,
}

#[derive(Deserialize)]
struct FileContent {
    #[serde(default)]
    content: String,
}

impl ReqwestClient {
    /// Creates a new GitHub client with the given configuration.
    pub fn new(config: ReqwestConfig) -> crate::Result<Self> {
        let timeout = config.effective_timeout();
        let user_agent = config.effective_user_agent();

        let base_url = Url::parse(&config.api_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| Error::BaseUrl(config.api_url.clone()))?;

        tracing::debug!(
            target: TRACING_TARGET,
            api_url = %base_url,
            timeout_ms = timeout.as_millis(),
            "Creating GitHub client"
        );

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_JSON));
        headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));
        if config.has_token() {
            let mut bearer = HeaderValue::from_str(&format!("Bearer {}", config.github_token.trim()))
                .map_err(|e| {
                    crate::Error::configuration()
                        .with_message("GitHub token contains invalid header characters")
                        .with_source(e)
                })?;
            bearer.set_sensitive(true);
            headers.insert(AUTHORIZATION, bearer);
        }

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .default_headers(headers)
            .build()
            .map_err(Error::from)?;

        let inner = ReqwestClientInner {
            http,
            base_url,
            config,
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Gets the client configuration.
    pub fn config(&self) -> &ReqwestConfig {
        &self.inner.config
    }

    /// Converts this client into a [`GithubService`] for use with dependency injection.
    pub fn into_service(self) -> GithubService {
        GithubService::new(self)
    }

    /// Builds an API URL from path segments, percent-encoding each one.
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, Error> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::BaseUrl(self.inner.config.api_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn repo_endpoint<'a>(
        &self,
        repo: &'a RepoRef,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, Error> {
        let prefix = ["repos", repo.owner.as_str(), repo.name.as_str()];
        self.endpoint(prefix.into_iter().chain(segments))
    }

    async fn send(&self, url: Url) -> Result<Response, Error> {
        let endpoint = url.path().to_owned();

        tracing::trace!(
            target: TRACING_TARGET,
            endpoint = %endpoint,
            "Sending GitHub request"
        );

        let response = self.inner.http.get(url).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::Status {
            endpoint,
            status,
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        let bytes = self.send(url).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Decodes the base64 payload of the contents API, which wraps lines.
fn decode_content(content: &str) -> Result<Vec<u8>, Error> {
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}

#[async_trait::async_trait]
impl GithubProvider for ReqwestClient {
    async fn list_runs_by_commit(
        &self,
        repo: &RepoRef,
        head_sha: &str,
    ) -> crate::Result<Vec<WorkflowRun>> {
        let mut url = self.repo_endpoint(repo, ["actions", "runs"])?;
        url.query_pairs_mut()
            .append_pair("head_sha", head_sha)
            .append_pair("per_page", PER_PAGE);

        let page: WorkflowRunsPage = self.get_json(url).await?;
        Ok(page.workflow_runs)
    }

    async fn list_jobs(&self, repo: &RepoRef, run_id: u64) -> crate::Result<Vec<Job>> {
        let run_id = run_id.to_string();
        let mut url = self.repo_endpoint(repo, ["actions", "runs", run_id.as_str(), "jobs"])?;
        url.query_pairs_mut().append_pair("per_page", PER_PAGE);

        let page: JobsPage = self.get_json(url).await?;
        Ok(page.jobs)
    }

    async fn list_artifacts(&self, repo: &RepoRef, run_id: u64) -> crate::Result<Vec<RunArtifact>> {
        let run_id = run_id.to_string();
        let mut url =
            self.repo_endpoint(repo, ["actions", "runs", run_id.as_str(), "artifacts"])?;
        url.query_pairs_mut().append_pair("per_page", PER_PAGE);

        let page: ArtifactsPage = self.get_json(url).await?;
        Ok(page.artifacts)
    }

    async fn download_artifact(&self, artifact: &RunArtifact) -> crate::Result<Bytes> {
        let url = Url::parse(&artifact.archive_download_url).map_err(|e| {
            crate::Error::invalid_input()
                .with_message(format!(
                    "invalid download URL for artifact {:?}",
                    artifact.name
                ))
                .with_source(e)
        })?;

        let bytes = self.send(url).await?.bytes().await.map_err(Error::from)?;
        Ok(bytes)
    }

    async fn file_content(
        &self,
        repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> crate::Result<Vec<u8>> {
        let segments = ["contents"]
            .into_iter()
            .chain(path.split('/').filter(|s| !s.is_empty()));
        let mut url = self.repo_endpoint(repo, segments)?;
        url.query_pairs_mut().append_pair("ref", git_ref);

        let file: FileContent = self.get_json(url).await?;
        Ok(decode_content(&file.content)?)
    }
}
