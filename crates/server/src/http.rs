//! HTTP Endpoints
//!
//! Gateway webhooks plus health endpoints. Webhook handlers respond with
//! rendered call-control documents; the reply itself never rides on these
//! responses, it arrives through mid-call injection.

use axum::{
    extract::{Form, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use callflow_asr::TranscriptionCallback;

use crate::media::media_ws_handler;
use crate::state::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Liveness probe for the gateway console
        .route("/", get(root))

        // Gateway webhooks
        .route("/voice", post(voice_webhook))
        .route("/transcription", post(transcription_webhook))
        .route("/call-status", post(call_status_webhook))

        // Media stream (streaming acquisition mode)
        .route("/media", get(media_ws_handler))

        // Health checks
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))

        // Middleware
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Respond with a rendered call-control document
fn twiml(body: String) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/xml")], body)
}

async fn root() -> &'static str {
    "Callflow voice server is running"
}

/// Inbound-call webhook payload
#[derive(Debug, Deserialize)]
struct VoiceWebhook {
    #[serde(rename = "CallSid")]
    call_sid: String,
}

/// Inbound call answered: greet and open the first capture
async fn voice_webhook(
    State(state): State<AppState>,
    Form(payload): Form<VoiceWebhook>,
) -> impl IntoResponse {
    twiml(state.orchestrator.call_started(&payload.call_sid))
}

/// Capture result posted by the gateway
async fn transcription_webhook(
    State(state): State<AppState>,
    Form(payload): Form<TranscriptionCallback>,
) -> impl IntoResponse {
    let call_sid = payload.call_sid.clone();
    let utterance = payload.into_utterance();
    twiml(state.orchestrator.utterance_received(&call_sid, utterance))
}

/// Call-status webhook payload
#[derive(Debug, Deserialize)]
struct StatusWebhook {
    #[serde(rename = "CallSid")]
    call_sid: String,

    #[serde(rename = "CallStatus")]
    call_status: String,
}

/// Statuses that mean the call is over
const TERMINAL_STATUSES: &[&str] = &["completed", "busy", "failed", "no-answer", "canceled"];

/// Call lifecycle updates from the gateway
async fn call_status_webhook(
    State(state): State<AppState>,
    Form(payload): Form<StatusWebhook>,
) -> StatusCode {
    if TERMINAL_STATUSES.contains(&payload.call_status.as_str()) {
        state.orchestrator.call_ended(&payload.call_sid);
    } else {
        tracing::debug!(
            call_id = %payload.call_sid,
            status = %payload.call_status,
            "Non-terminal call status"
        );
    }
    StatusCode::OK
}

/// Health check
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness check
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ready",
        "sessions": state.orchestrator.session_count(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use callflow_config::Settings;

    #[test]
    fn test_router_creation() {
        let state = AppState::new(Settings::default());
        let _ = create_router(state);
    }

    #[test]
    fn test_status_webhook_decoding() {
        let payload: StatusWebhook = serde_json::from_value(serde_json::json!({
            "CallSid": "CA1",
            "CallStatus": "completed",
        }))
        .unwrap();
        assert_eq!(payload.call_sid, "CA1");
        assert!(TERMINAL_STATUSES.contains(&payload.call_status.as_str()));
    }
}
