use serde::{Deserialize, Serialize};

use super::null_as_default;

/// A GitHub Actions workflow run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowRun {
    pub id: u64,
    /// Workflow display name.
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub head_sha: String,
    pub head_branch: Option<String>,
    /// Path of the workflow definition file.
    #[serde(deserialize_with = "null_as_default")]
    pub path: String,
    /// Triggering event kind.
    #[serde(deserialize_with = "null_as_default")]
    pub event: String,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    /// Final conclusion; absent while the run is in progress.
    pub conclusion: Option<String>,
    pub actor: Option<Actor>,
}

impl WorkflowRun {
    /// Returns true if the run finished with the `success` conclusion.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.conclusion.as_deref() == Some("success")
    }
}

/// A GitHub user account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Actor {
    #[serde(deserialize_with = "null_as_default")]
    pub login: String,
}
