//! HTTP handlers.

use axum::body::{to_bytes, Body};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use subtle::ConstantTimeEq;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::state::AppState;
use crate::security::{
    sanitize_message, validate_phone_number, verify, SignatureError, SIGNATURE_HEADER,
};
use crate::whatsapp::{WebhookEvent, WebhookVerification};

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

impl IntoResponse for SignatureError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        detail(status, self.detail())
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// GET /
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "WhatsApp relay is running!" }))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "environment": state.config.environment,
    }))
}

/// GET /stats
pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.stats_snapshot())
}

/// GET /webhook: subscription handshake.
pub async fn verify_subscription(
    State(state): State<AppState>,
    Query(params): Query<WebhookVerification>,
) -> Response {
    let expected = state.config.whatsapp.verify_token.as_deref().unwrap_or("");
    let token_matches = !expected.is_empty()
        && params
            .verify_token
            .as_deref()
            .is_some_and(|t| constant_time_eq(t, expected));

    if params.mode.as_deref() == Some("subscribe") && token_matches {
        return match params.challenge {
            Some(challenge) => {
                info!("Webhook subscription verified");
                (StatusCode::OK, challenge).into_response()
            }
            None => (StatusCode::BAD_REQUEST, "Missing hub.challenge").into_response(),
        };
    }

    warn!(mode = ?params.mode, "Webhook subscription verification failed");
    (StatusCode::FORBIDDEN, "Forbidden").into_response()
}

/// What happened to the messages of one delivery.
#[derive(Debug, Default, PartialEq, Eq)]
struct DeliveryOutcome {
    replied: usize,
    rate_limited: usize,
    skipped: usize,
}

/// POST /webhook: inbound message delivery.
#[instrument(skip_all, fields(delivery_id = %Uuid::new_v4()))]
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    if state.webhook_secret().is_some() && signature.is_none() {
        warn!("Missing signature header");
        return SignatureError::MissingSignature.into_response();
    }

    let raw_body = match to_bytes(body, state.config.server.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => return SignatureError::Verification(e.to_string()).into_response(),
    };

    if let Err(e) = verify(state.webhook_secret(), &raw_body, signature) {
        return e.into_response();
    }

    let event: WebhookEvent = match serde_json::from_slice(&raw_body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Invalid webhook payload");
            return detail(StatusCode::BAD_REQUEST, "Invalid JSON payload");
        }
    };

    let outcome = relay_messages(&state, &event).await;

    for status in event.statuses() {
        debug!(message_id = %status.id, status = %status.status, "Message status update");
    }

    info!(
        replied = outcome.replied,
        rate_limited = outcome.rate_limited,
        skipped = outcome.skipped,
        "Webhook processed"
    );

    if outcome.rate_limited > 0 && outcome.replied == 0 {
        return detail(StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded");
    }

    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

async fn relay_messages(state: &AppState, event: &WebhookEvent) -> DeliveryOutcome {
    let mut outcome = DeliveryOutcome::default();

    for message in event.messages() {
        state.stats.record_received();

        let Some(text) = message.text_body() else {
            debug!(kind = %message.kind, "Skipping non-text message");
            outcome.skipped += 1;
            continue;
        };

        let sender = message.from.as_str();
        if !validate_phone_number(sender) {
            warn!(sender = %sender, "Ignoring message from invalid sender id");
            outcome.skipped += 1;
            continue;
        }

        if !state.limiter.is_allowed(sender) {
            warn!(sender = %sender, "Rate limit exceeded");
            state.stats.record_rate_limited();
            outcome.rate_limited += 1;
            continue;
        }

        state.sender.mark_message_as_read(&message.id).await;

        let text = sanitize_message(text);
        if text.trim().is_empty() {
            outcome.skipped += 1;
            continue;
        }

        let reply = state.assistant.generate_response(&text, sender).await;
        if state.sender.send_message(sender, &reply).await {
            state.stats.record_sent();
        }
        outcome.replied += 1;
    }

    outcome
}

fn authorized(state: &AppState, headers: &HeaderMap) -> bool {
    let Some(expected) = state.config.server.admin_token.as_deref() else {
        return false;
    };
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| constant_time_eq(token, expected))
}

/// GET /conversations/{user_id}
pub async fn get_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Response {
    if !authorized(&state, &headers) {
        return detail(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    Json(state.assistant.conversation_history(&user_id)).into_response()
}

/// DELETE /conversations/{user_id}
pub async fn clear_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Response {
    if !authorized(&state, &headers) {
        return detail(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    if state.assistant.clear_conversation_history(&user_id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        detail(StatusCode::NOT_FOUND, "Conversation not found")
    }
}

/// GET /conversations/{user_id}/summary
pub async fn summarize_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Response {
    if !authorized(&state, &headers) {
        return detail(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let history = state.assistant.conversation_history(&user_id);
    if history.is_empty() {
        return detail(StatusCode::NOT_FOUND, "Conversation not found");
    }
    let summary = state.assistant.generate_summary(&history).await;
    Json(json!({ "user_id": user_id, "summary": summary })).into_response()
}

/// POST /stats/reset
pub async fn reset_stats(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return detail(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    state.stats.reset();
    StatusCode::NO_CONTENT.into_response()
}
