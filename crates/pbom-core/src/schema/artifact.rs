//! Produced artifacts and their security posture.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Artifact type used for container images.
pub const CONTAINER_IMAGE: &str = "container-image";

/// A produced artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Artifact {
    pub name: String,
    #[serde(rename = "type")]
    pub artifact_type: String,
    /// Content digest, `sha256:<64 lowercase hex>`.
    pub digest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vulnerabilities: Option<Vulnerabilities>,
}

impl Artifact {
    /// Creates a container image artifact.
    ///
    /// The URI is the image reference pinned to the digest when one is known.
    pub fn container_image(
        name: impl Into<String>,
        image: &str,
        digest: impl Into<String>,
        tags: Vec<String>,
    ) -> Self {
        let digest = digest.into();
        let uri = match (image.is_empty(), digest.is_empty()) {
            (true, _) => None,
            (false, true) => Some(image.to_owned()),
            (false, false) => Some(format!("{image}@{digest}")),
        };

        Self {
            name: name.into(),
            artifact_type: CONTAINER_IMAGE.to_owned(),
            digest,
            uri,
            tags,
            provenance: None,
            vulnerabilities: None,
        }
    }
}

/// SLSA attestation metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Provenance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slsa_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub builder_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attestation_uri: Option<String>,
}

/// Point-in-time vulnerability counts at build time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vulnerabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanned_at: Option<Timestamp>,
    pub critical: u32,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
}
