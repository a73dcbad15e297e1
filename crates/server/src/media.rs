//! Media stream handler
//!
//! Accepts the gateway's per-call audio WebSocket, forwards decoded audio
//! chunks to the streaming recognizer, and hands finished utterances to the
//! orchestrator. One socket, one recognizer, one call.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use base64::Engine as _;
use serde::Deserialize;
use tokio::sync::mpsc;

use callflow_asr::{RecognizerConfig, RecognizerEvent, TurnCollector, WsRecognizer};

use crate::state::AppState;
use crate::ServerError;

/// WebSocket upgrade for the gateway media stream
pub async fn media_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = handle_media_stream(socket, state).await {
            tracing::warn!(error = %e, "Media stream ended with error");
        }
    })
}

/// Messages the gateway sends over the media socket
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum StreamEvent {
    Connected,
    Start { start: StreamStart },
    Media { media: MediaFrame },
    Mark,
    Stop,
}

#[derive(Debug, Deserialize)]
struct StreamStart {
    #[serde(rename = "callSid")]
    call_sid: String,
}

#[derive(Debug, Deserialize)]
struct MediaFrame {
    /// Base64-encoded audio chunk
    payload: String,
}

async fn handle_media_stream(mut socket: WebSocket, state: AppState) -> Result<(), ServerError> {
    let mut call_id: Option<String> = None;
    let mut recognizer: Option<WsRecognizer> = None;
    let mut events: Option<mpsc::Receiver<RecognizerEvent>> = None;
    let mut collector = TurnCollector::new(state.config.speech.act_on_interim);

    loop {
        tokio::select! {
            message = socket.recv() => {
                let Some(message) = message else { break };
                let message = message.map_err(|e| ServerError::Protocol(e.to_string()))?;

                match message {
                    Message::Text(text) => {
                        let event = match serde_json::from_str::<StreamEvent>(&text) {
                            Ok(event) => event,
                            Err(_) => {
                                tracing::debug!("Ignoring unrecognized media stream frame");
                                continue;
                            }
                        };

                        match event {
                            StreamEvent::Connected | StreamEvent::Mark => {}

                            StreamEvent::Start { start } => {
                                tracing::info!(call_id = %start.call_sid, "Media stream started");
                                call_id = Some(start.call_sid);

                                let config = recognizer_config(&state);
                                match WsRecognizer::connect(&config).await {
                                    Ok((handle, rx)) => {
                                        recognizer = Some(handle);
                                        events = Some(rx);
                                    }
                                    Err(e) => {
                                        // The call degrades to no-input retries
                                        tracing::warn!(
                                            error = %e,
                                            "Recognizer connection failed, continuing without recognition"
                                        );
                                    }
                                }
                            }

                            StreamEvent::Media { media } => {
                                let Some(handle) = recognizer.as_mut() else { continue };
                                let bytes = base64::engine::general_purpose::STANDARD
                                    .decode(&media.payload)
                                    .map_err(|e| ServerError::Protocol(e.to_string()))?;
                                if let Err(e) = handle.send_audio(bytes).await {
                                    tracing::warn!(error = %e, "Recognizer write failed, dropping stream");
                                    recognizer = None;
                                }
                            }

                            StreamEvent::Stop => {
                                if let Some(id) = &call_id {
                                    tracing::info!(call_id = %id, "Media stream stopped");
                                }
                                break;
                            }
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }

            event = next_event(&mut events) => {
                match event {
                    Some(event) => {
                        if let Some(utterance) = collector.offer(event) {
                            if let Some(id) = &call_id {
                                state.orchestrator.streamed_utterance(id, utterance).await;
                            }
                        }
                    }
                    None => {
                        // Recognizer reader finished; stop polling it
                        events = None;
                    }
                }
            }
        }
    }

    if let Some(mut handle) = recognizer {
        let _ = handle.close().await;
    }
    Ok(())
}

/// Await the next recognizer event, or park forever when no recognizer is
/// attached yet.
async fn next_event(
    events: &mut Option<mpsc::Receiver<RecognizerEvent>>,
) -> Option<RecognizerEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn recognizer_config(state: &AppState) -> RecognizerConfig {
    let speech = &state.config.speech;
    RecognizerConfig {
        ws_url: speech.ws_url.clone(),
        api_key: speech.api_key.clone(),
        encoding: speech.encoding.clone(),
        sample_rate_hz: speech.sample_rate_hz,
        language: speech.language.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_event_decoding() {
        let json = r#"{"event":"start","sequenceNumber":"1","start":{"callSid":"CA1","streamSid":"MZ1"}}"#;
        match serde_json::from_str::<StreamEvent>(json) {
            Ok(StreamEvent::Start { start }) => assert_eq!(start.call_sid, "CA1"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_media_event_decoding() {
        let json = r#"{"event":"media","media":{"track":"inbound","payload":"AAAA"}}"#;
        match serde_json::from_str::<StreamEvent>(json) {
            Ok(StreamEvent::Media { media }) => {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(media.payload)
                    .unwrap();
                assert_eq!(bytes.len(), 3);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_stop_event_decoding() {
        assert!(matches!(
            serde_json::from_str::<StreamEvent>(r#"{"event":"stop"}"#),
            Ok(StreamEvent::Stop)
        ));
    }
}
