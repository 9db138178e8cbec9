use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::{info, warn};

use voxgate_core::errors::WebhookError;

use crate::server::AppState;
use crate::webhook::error_response;

/// Session-authorization proxy. Forwards the client's JSON body with the
/// server-held API key to the platform's authorization endpoint and relays
/// the JSON response and status code verbatim. The browser never sees the
/// key.
pub async fn authorize_handler(State(state): State<AppState>, body: Bytes) -> Response {
    match authorize(&state, &body).await {
        Ok(response) => response,
        Err(err) => error_response(&err),
    }
}

async fn authorize(state: &AppState, body: &Bytes) -> Result<Response, WebhookError> {
    let payload: Value = serde_json::from_slice(body)
        .map_err(|_| WebhookError::InvalidPayload("invalid JSON body".into()))?;
    if !payload.is_object() {
        return Err(WebhookError::InvalidPayload("invalid JSON body".into()));
    }

    let api_key = state
        .config
        .api_key
        .as_ref()
        .ok_or(WebhookError::ConfigurationMissing("LAYERCODE_API_KEY"))?;

    let response = state
        .http
        .post(&state.config.authorize_url)
        .bearer_auth(api_key.expose_secret())
        .json(&payload)
        .send()
        .await
        .map_err(|e| {
            warn!(error = %e, "failed to reach authorization endpoint");
            WebhookError::UpstreamUnreachable(e.to_string())
        })?;

    let status = response.status();
    let body_text = response
        .text()
        .await
        .map_err(|e| WebhookError::UpstreamUnreachable(e.to_string()))?;

    if !status.is_success() {
        return Err(WebhookError::UpstreamStatus {
            status: status.as_u16(),
            body: body_text,
        });
    }

    info!("session authorized");
    let json: Value = serde_json::from_str(&body_text).unwrap_or(Value::Null);
    Ok((StatusCode::OK, Json(json)).into_response())
}
