//! Promotion path of an artifact through deployment stages.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Promotion of the artifact into a deployment stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Promotion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freight_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promoted_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promoted_at: Option<Timestamp>,
    /// Other services present in the target environment at promotion time.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub environment_snapshot: Vec<CoDeployedService>,
}

/// A service deployed next to the promoted artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoDeployedService {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}
