//! Root document and source sub-record.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::{Artifact, Build, Promotion};

/// Document format version written into every record.
pub const VERSION: &str = "1.0.0";

/// Root Pipeline Bill of Materials document.
///
/// Decoding is lenient: members missing from the input take their default
/// value, so a partially filled skeleton still decodes and is completed by
/// enrichment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineRecord {
    /// Document format version, see [`VERSION`].
    pub pbom_version: String,
    /// Unique record identifier.
    pub id: String,
    /// Creation time of the record.
    pub timestamp: Timestamp,
    /// Exact source code state.
    pub source: Source,
    /// CI execution context.
    pub build: Build,
    /// Produced artifacts in discovery order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
    /// Promotion data, carried through untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion: Option<Promotion>,
}

impl PipelineRecord {
    /// Creates a record stamped with the current version and time.
    pub fn new(id: impl Into<String>, source: Source, build: Build) -> Self {
        Self {
            pbom_version: VERSION.to_owned(),
            id: id.into(),
            timestamp: Timestamp::now(),
            source,
            build,
            artifacts: Vec::new(),
            promotion: None,
        }
    }
}

/// Source code state the build ran against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Source {
    /// Repository in `owner/name` form.
    pub repository: String,
    /// Full 40 character commit SHA.
    pub commit_sha: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}
