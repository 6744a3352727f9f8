//! Liveness and intake status handlers.

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::get;

use crate::handler::response::ServiceStatus;
use crate::service::{EventStats, ServiceState};

/// Tracing target for monitor operations.
const TRACING_TARGET: &str = "pbom_server::handler::monitors";

/// Answers `ok` while the process is serving requests.
async fn health() -> &'static str {
    "ok"
}

#[tracing::instrument(skip_all)]
async fn status(State(stats): State<EventStats>) -> Json<ServiceStatus> {
    let status = ServiceStatus::from(stats.snapshot());

    tracing::debug!(
        target: TRACING_TARGET,
        events_processed = status.events_processed,
        "Status requested"
    );

    Json(status)
}

/// Returns a [`Router`] with the health and status routes.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use pbom_test::MockGithubProvider;
    use tempfile::TempDir;

    use super::*;
    use crate::handler::test::{create_test_server_with_state, create_test_state};

    #[tokio::test]
    async fn health_answers_ok() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let state = create_test_state(&MockGithubProvider::new(), dir.path()).await?;
        let server = create_test_server_with_state(routes(), state)?;

        let response = server.get("/health").await;
        response.assert_status_ok();
        response.assert_text("ok");
        Ok(())
    }

    #[tokio::test]
    async fn status_omits_last_event_before_any_event() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let state = create_test_state(&MockGithubProvider::new(), dir.path()).await?;
        let server = create_test_server_with_state(routes(), state)?;

        let response = server.get("/status").await;
        response.assert_status_ok();

        let body = response.json::<serde_json::Value>();
        assert_eq!(body["events_processed"], 0);
        assert!(body.get("last_event_at").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn status_reports_recorded_events() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let state = create_test_state(&MockGithubProvider::new(), dir.path()).await?;
        state.stats.record_now();
        state.stats.record_now();
        let server = create_test_server_with_state(routes(), state)?;

        let response = server.get("/status").await;
        let status = response.json::<ServiceStatus>();

        assert_eq!(status.events_processed, 2);
        assert!(status.last_event_at.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn status_rejects_post() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let state = create_test_state(&MockGithubProvider::new(), dir.path()).await?;
        let server = create_test_server_with_state(routes(), state)?;

        let response = server.post("/status").await;
        response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
        Ok(())
    }
}
