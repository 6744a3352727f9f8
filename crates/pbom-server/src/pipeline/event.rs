//! Inbound `workflow_run` webhook payload.

use pbom_github::RepoRef;
use pbom_github::types::null_as_default;
use serde::{Deserialize, Serialize};

/// Value of the `X-GitHub-Event` header for workflow run deliveries.
pub const WORKFLOW_RUN_EVENT: &str = "workflow_run";

/// Action of a delivery announcing a finished run.
pub const COMPLETED_ACTION: &str = "completed";

/// The members of a `workflow_run` delivery read by the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookEvent {
    #[serde(deserialize_with = "null_as_default")]
    pub action: String,
    pub workflow_run: RunPayload,
    pub repository: RepositoryPayload,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunPayload {
    pub id: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub head_sha: String,
    pub head_branch: Option<String>,
    pub path: Option<String>,
    pub event: Option<String>,
    pub conclusion: Option<String>,
    pub actor: Option<AccountPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryPayload {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub full_name: String,
    pub owner: AccountPayload,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountPayload {
    #[serde(deserialize_with = "null_as_default")]
    pub login: String,
}

impl WebhookEvent {
    /// Returns true for deliveries announcing a finished run.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.action == COMPLETED_ACTION
    }

    /// Returns the repository the run belongs to.
    ///
    /// Prefers the owner login and name members and falls back to splitting
    /// the full name.
    pub fn repo(&self) -> pbom_core::Result<RepoRef> {
        let repository = &self.repository;
        if !repository.owner.login.is_empty() && !repository.name.is_empty() {
            return Ok(RepoRef::new(&repository.owner.login, &repository.name));
        }

        RepoRef::parse(&repository.full_name)
    }

    /// Returns the login of the account that triggered the run.
    pub fn actor_login(&self) -> Option<&str> {
        self.workflow_run
            .actor
            .as_ref()
            .map(|actor| actor.login.as_str())
            .filter(|login| !login.is_empty())
    }

    /// Returns the workflow file path, if the delivery carried one.
    pub fn workflow_path(&self) -> Option<&str> {
        self.workflow_run.path.as_deref().filter(|p| !p.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELIVERY: &str = r#"{
        "action": "completed",
        "workflow_run": {
            "id": 42,
            "name": "CI",
            "head_sha": "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            "head_branch": "main",
            "path": ".github/workflows/ci.yml",
            "event": "push",
            "status": "completed",
            "conclusion": "success",
            "actor": { "login": "octocat", "id": 1 }
        },
        "repository": {
            "id": 7,
            "name": "widget",
            "full_name": "acme/widget",
            "owner": { "login": "acme" }
        },
        "sender": { "login": "octocat" }
    }"#;

    #[test]
    fn parse_delivery() {
        let event: WebhookEvent = serde_json::from_str(DELIVERY).unwrap();

        assert!(event.is_completed());
        assert_eq!(event.workflow_run.id, 42);
        assert_eq!(event.workflow_run.head_branch.as_deref(), Some("main"));
        assert_eq!(event.actor_login(), Some("octocat"));
        assert_eq!(event.workflow_path(), Some(".github/workflows/ci.yml"));
        assert_eq!(event.repo().unwrap(), RepoRef::new("acme", "widget"));
    }

    #[test]
    fn repo_falls_back_to_full_name() {
        let event = WebhookEvent {
            repository: RepositoryPayload {
                full_name: "acme/widget".into(),
                ..RepositoryPayload::default()
            },
            ..WebhookEvent::default()
        };

        assert_eq!(event.repo().unwrap(), RepoRef::new("acme", "widget"));
    }

    #[test]
    fn null_members_take_defaults() {
        let delivery = DELIVERY
            .replace(r#""name": "CI""#, r#""name": null"#)
            .replace(r#""full_name": "acme/widget""#, r#""full_name": null"#);
        let event: WebhookEvent = serde_json::from_str(&delivery).unwrap();

        assert!(event.is_completed());
        assert_eq!(event.workflow_run.name, "");
        assert_eq!(event.repository.full_name, "");
        assert_eq!(event.repo().unwrap(), RepoRef::new("acme", "widget"));
    }

    #[test]
    fn missing_members_take_defaults() {
        let event: WebhookEvent = serde_json::from_str(r#"{"action":"requested"}"#).unwrap();

        assert!(!event.is_completed());
        assert!(event.actor_login().is_none());
        assert!(event.repo().is_err());
    }
}
