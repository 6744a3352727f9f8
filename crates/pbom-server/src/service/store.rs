//! Durable storage of enriched records.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pbom_core::PipelineRecord;
use pbom_github::RepoRef;

/// Tracing target for record storage.
const TRACING_TARGET: &str = "pbom_server::service::store";

/// Errors raised while persisting a record.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Writes records as pretty JSON files named after the run they describe.
///
/// Each write lands in a temporary file first and is renamed into place, so
/// readers never observe a partially written record. Writing the same run
/// twice replaces the earlier file.
#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: Arc<PathBuf>,
}

impl RecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Arc::new(dir.into()),
        }
    }

    /// Returns the storage directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file name for a run: `{owner}_{repo}_{run_id}.pbom.json`.
    pub fn file_name(repo: &RepoRef, run_id: u64) -> String {
        format!(
            "{}_{}_{run_id}.pbom.json",
            sanitize(&repo.owner),
            sanitize(&repo.name)
        )
    }

    /// Returns the path a run's record is written to.
    pub fn path_for(&self, repo: &RepoRef, run_id: u64) -> PathBuf {
        self.dir.join(Self::file_name(repo, run_id))
    }

    /// Serializes and writes `record`, creating the directory if needed.
    pub async fn save(
        &self,
        repo: &RepoRef,
        run_id: u64,
        record: &PipelineRecord,
    ) -> Result<PathBuf, StoreError> {
        let json = serde_json::to_vec_pretty(record)?;

        tokio::fs::create_dir_all(self.dir.as_path())
            .await
            .map_err(StoreError::io(&self.dir))?;

        let path = self.path_for(repo, run_id);
        let staging = self
            .dir
            .join(format!(".{}.{}.tmp", Self::file_name(repo, run_id), uuid::Uuid::new_v4()));

        if let Err(source) = tokio::fs::write(&staging, &json).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(StoreError::Io {
                path: staging,
                source,
            });
        }

        if let Err(source) = tokio::fs::rename(&staging, &path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(StoreError::Io { path, source });
        }

        tracing::info!(
            target: TRACING_TARGET,
            path = %path.display(),
            size = json.len(),
            "Record saved"
        );

        Ok(path)
    }
}

fn sanitize(segment: &str) -> String {
    segment
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect()
}
