//! GitHub webhook intake.
//!
//! Deliveries are authenticated, filtered down to completed `workflow_run`
//! events and handed to the enrichment dispatcher. The response never waits
//! for enrichment.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::routing::any;

use crate::handler::{ErrorKind, Result};
use crate::pipeline::{COLLECTOR_WORKFLOW, WORKFLOW_RUN_EVENT, WebhookEvent};
use crate::service::{EventStats, ServiceState, SignatureVerifier};
use crate::worker::EnrichmentDispatcher;

/// Tracing target for webhook intake.
const TRACING_TARGET: &str = "pbom_server::handler::webhooks";

/// Largest accepted delivery body.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Header carrying the HMAC-SHA256 signature of the body.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Header naming the event kind of a delivery.
pub const EVENT_HEADER: &str = "x-github-event";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Receives a webhook delivery.
///
/// Answers 202 once an event is dispatched, 200 for deliveries that are
/// filtered out, 400 for unreadable payloads, 401 for bad signatures and 405
/// for anything but POST.
#[tracing::instrument(skip_all, fields(method = %method))]
async fn receive_webhook(
    State(verifier): State<SignatureVerifier>,
    State(stats): State<EventStats>,
    State(dispatcher): State<EnrichmentDispatcher>,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> Result<StatusCode> {
    if method != Method::POST {
        return Err(ErrorKind::MethodNotAllowed.with_message("Webhooks must be POSTed"));
    }

    let payload = to_bytes(body, MAX_BODY_BYTES).await.map_err(|error| {
        ErrorKind::BadRequest
            .with_message("Failed to read request body")
            .with_context(error.to_string())
    })?;

    verifier.verify(&payload, header(&headers, SIGNATURE_HEADER))?;

    let event_kind = header(&headers, EVENT_HEADER).unwrap_or_default();
    if event_kind != WORKFLOW_RUN_EVENT {
        tracing::debug!(
            target: TRACING_TARGET,
            event = event_kind,
            "Ignoring non workflow_run delivery"
        );
        return Ok(StatusCode::OK);
    }

    let event: WebhookEvent = serde_json::from_slice(&payload).map_err(|error| {
        ErrorKind::BadRequest
            .with_message("Invalid workflow_run payload")
            .with_context(error.to_string())
    })?;

    if !event.is_completed() {
        tracing::debug!(
            target: TRACING_TARGET,
            action = %event.action,
            "Ignoring workflow_run action"
        );
        return Ok(StatusCode::OK);
    }

    if event.workflow_run.name == COLLECTOR_WORKFLOW {
        tracing::debug!(
            target: TRACING_TARGET,
            repository = %event.repository.full_name,
            run_id = event.workflow_run.id,
            "Skipping collector run"
        );
        return Ok(StatusCode::OK);
    }

    if let Err(error) = event.repo() {
        return Err(ErrorKind::BadRequest
            .with_message("Payload does not identify its repository")
            .with_context(error.to_string()));
    }

    tracing::info!(
        target: TRACING_TARGET,
        repository = %event.repository.full_name,
        workflow = %event.workflow_run.name,
        run_id = event.workflow_run.id,
        conclusion = event.workflow_run.conclusion.as_deref().unwrap_or_default(),
        "Processing completed workflow run"
    );

    stats.record_now();
    dispatcher.dispatch(event);

    Ok(StatusCode::ACCEPTED)
}

/// Returns a [`Router`] with the webhook intake route.
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/webhook", any(receive_webhook))
}
