//! CI execution context.

use std::collections::BTreeMap;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// CI run that produced the record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Build {
    /// Run identifier, kept as a string to match the document format.
    pub workflow_run_id: String,
    pub workflow_name: String,
    /// Path of the workflow definition inside the repository.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_file: Option<String>,
    /// Event kind that triggered the run (`push`, `pull_request`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    pub actor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runner: Option<Runner>,
    /// Tool name to version.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tool_versions: BTreeMap<String, String>,
    /// Sorted, deduplicated secret names referenced by the workflow.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub secrets_accessed: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
    /// Run conclusion (`success`, `failure`, ...).
    pub status: String,
}

/// Runner environment the build executed on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Runner {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub self_hosted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hosted_runner_omits_flag() {
        let runner = Runner {
            os: Some("Linux".into()),
            arch: Some("X64".into()),
            name: None,
            self_hosted: false,
        };

        let value = serde_json::to_value(&runner).unwrap();
        assert_eq!(value, serde_json::json!({ "os": "Linux", "arch": "X64" }));
    }

    #[test]
    fn timestamps_serialize_as_rfc3339() {
        let build = Build {
            started_at: Some("2026-01-10T10:00:00Z".parse().unwrap()),
            ..Build::default()
        };

        let value = serde_json::to_value(&build).unwrap();
        assert_eq!(value["started_at"], "2026-01-10T10:00:00Z");
        assert!(value.get("completed_at").is_none());
    }
}
