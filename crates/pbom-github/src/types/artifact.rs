use serde::{Deserialize, Serialize};

use super::null_as_default;

/// An artifact uploaded by a workflow run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunArtifact {
    pub id: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    pub size_in_bytes: u64,
    /// API endpoint that redirects to the zip archive.
    #[serde(deserialize_with = "null_as_default")]
    pub archive_download_url: String,
}
