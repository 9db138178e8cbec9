use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use secrecy::ExposeSecret;
use serde_json::json;
use tracing::{info, warn};

use voxgate_core::errors::WebhookError;
use voxgate_core::events::{parse_webhook_event, MessageEvent, SessionStartEvent, WebhookEvent};
use voxgate_core::signature::verify_signature;

use crate::server::AppState;
use crate::stream::stream_response;

pub const SIGNATURE_HEADER: &str = "layercode-signature";

/// The webhook endpoint. Walks the dispatch state machine:
/// verify signature → parse event → acquire conversation lock → dispatch by
/// kind → release. Any failure before dispatch maps to an HTTP error; the
/// lock is released on every exit path because it lives in an RAII guard.
pub async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match dispatch(&state, &headers, &body).await {
        Ok(response) => response,
        Err(err) => error_response(&err),
    }
}

async fn dispatch(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Response, WebhookError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingSignature)?;

    let secret = state
        .config
        .webhook_secret
        .as_ref()
        .ok_or(WebhookError::ConfigurationMissing("LAYERCODE_WEBHOOK_SECRET"))?;

    let body_str = std::str::from_utf8(body)
        .map_err(|e| WebhookError::InvalidPayload(format!("body is not UTF-8: {e}")))?;

    verify_signature(
        body_str,
        signature,
        secret.expose_secret(),
        state.config.signature_tolerance_seconds,
    )?;

    let event = parse_webhook_event(body)?;

    info!(
        event_type = event.event_type(),
        conversation_id = %event.conversation_id(),
        session_id = %event.session_id(),
        "webhook received"
    );

    // Everything from here on runs under the conversation lock. For the
    // streaming paths the guard moves into the producer task, so the lock is
    // held until the handler has finished and (for messages) its output is
    // appended — never released between history read and append.
    let guard = state.store.acquire(event.conversation_id()).await;

    match event {
        WebhookEvent::SessionStart(event) => Ok(handle_session_start(state, event, guard)),
        WebhookEvent::Message(event) => Ok(handle_message(state, event, guard)),
        WebhookEvent::SessionEnd(event) => {
            // Fire-and-forget from the protocol's perspective: the agent may
            // flush state, but the response is a plain acknowledgement.
            if let Err(err) = state.agent.handle_session_end(&event).await {
                warn!(error = %err, "session end handler failed");
            }
            drop(guard);
            Ok(ack())
        }
        WebhookEvent::SessionUpdate(_) => {
            drop(guard);
            Ok(ack())
        }
        WebhookEvent::Data(event) => {
            // Parsed for schema validation, but the dispatcher has no
            // branch for it. The guard still releases on this path.
            info!(turn_id = %event.turn_id, keys = event.data.len(), "data event rejected");
            drop(guard);
            Err(WebhookError::UnsupportedEventType("data".into()))
        }
    }
}

fn handle_session_start(
    state: &AppState,
    event: SessionStartEvent,
    guard: voxgate_store::ConversationGuard,
) -> Response {
    let agent = Arc::clone(&state.agent);
    stream_response(event.turn_id.clone(), move |stream| async move {
        let _guard = guard;
        agent.handle_session_start(&event, &stream).await
    })
}

fn handle_message(
    state: &AppState,
    event: MessageEvent,
    guard: voxgate_store::ConversationGuard,
) -> Response {
    let agent = Arc::clone(&state.agent);
    let store = Arc::clone(&state.store);
    // History is read while the lock is held; the append below happens in
    // the same critical section, before the guard drops.
    let history = store.history(&event.conversation_id);

    stream_response(event.turn_id.clone(), move |stream| async move {
        let _guard = guard;
        let new_messages = agent.handle_message(&event, &stream, &history).await?;
        store.append(&event.conversation_id, new_messages);
        Ok(())
    })
}

fn ack() -> Response {
    Json(json!({"status": "ok"})).into_response()
}

pub(crate) fn error_response(err: &WebhookError) -> Response {
    match err.status_code() {
        401 => warn!(kind = err.error_kind(), error = %err, "webhook rejected"),
        500 | 502 => warn!(kind = err.error_kind(), error = %err, "webhook failed"),
        _ => info!(kind = err.error_kind(), error = %err, "webhook rejected"),
    }
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({"error": err.to_string()}))).into_response()
}
