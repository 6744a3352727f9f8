use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::null_as_default;

/// A single job within a workflow run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Job {
    pub id: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    /// Runner labels requested by the job, e.g. `ubuntu-latest`.
    #[serde(deserialize_with = "null_as_default")]
    pub labels: Vec<String>,
    pub runner_name: Option<String>,
    pub runner_group_name: Option<String>,
}
