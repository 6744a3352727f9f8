//! JSON extraction from zipped workflow artifacts.

use std::io::Cursor;

use pbom_core::Artifact;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use zip::ZipArchive;
use zip::result::ZipError;

/// Name prefix of artifacts carrying container image metadata.
pub const DOCKER_METADATA_PREFIX: &str = "docker-metadata-";

/// Errors raised while reading a JSON document out of an artifact archive.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("failed to read artifact archive: {0}")]
    Zip(#[from] ZipError),
    #[error("artifact archive contains no .json entry")]
    NoJsonEntry,
    #[error("failed to decode {entry}: {source}")]
    Decode {
        entry: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Decodes the first `.json` entry of a zip archive.
pub fn extract_json<T: DeserializeOwned>(archive: &[u8]) -> Result<T, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(archive))?;

    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        if !entry.name().ends_with(".json") {
            continue;
        }

        let name = entry.name().to_owned();
        return serde_json::from_reader(entry).map_err(|source| ArchiveError::Decode {
            entry: name,
            source,
        });
    }

    Err(ArchiveError::NoJsonEntry)
}

/// Container image facts written by a build as a `docker-metadata-*` artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerMetadata {
    pub image: String,
    pub digest: String,
    /// Newline separated image tags.
    pub tags: String,
}

impl DockerMetadata {
    /// Returns the tags, trimmed, without blank lines.
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .lines()
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// Converts the metadata into a container image artifact named `name`.
    pub fn into_artifact(self, name: impl Into<String>) -> Artifact {
        let tags = self.tag_list();
        Artifact::container_image(name, &self.image, self.digest, tags)
    }
}

/// Returns true if `artifact_name` follows the image metadata convention.
pub fn is_docker_metadata(artifact_name: &str) -> bool {
    artifact_name.starts_with(DOCKER_METADATA_PREFIX)
}
