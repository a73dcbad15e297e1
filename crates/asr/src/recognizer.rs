//! Streaming recognizer client
//!
//! Connects to a WebSocket streaming-recognition endpoint, forwards opaque
//! audio bytes, and emits transcript events. One recognizer is owned
//! exclusively by one call's media connection and never shared.

use futures_util::stream::{SplitSink, StreamExt};
use futures_util::SinkExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use callflow_core::Utterance;
use serde::Deserialize;

use crate::AsrError;

/// Audio configuration for a recognition stream
#[derive(Debug, Clone)]
pub struct RecognizerConfig {
    /// WebSocket endpoint
    pub ws_url: String,
    /// API key sent as an authorization header; empty disables the header
    pub api_key: String,
    /// Audio encoding of the forwarded bytes
    pub encoding: String,
    /// Sample rate of the forwarded bytes
    pub sample_rate_hz: u32,
    /// Recognition language
    pub language: String,
}

/// Event emitted by a recognition stream
#[derive(Debug, Clone)]
pub enum RecognizerEvent {
    /// A transcript result, interim or final
    Transcript(Utterance),
    /// The remote side closed the stream
    Closed,
    /// Recognizer failure; the call continues without an utterance
    Error(String),
}

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Handle for one live recognition stream
pub struct WsRecognizer {
    sink: WsSink,
}

impl WsRecognizer {
    /// Connect to the recognizer and start the reader task.
    ///
    /// Returns the write handle and the event receiver.
    pub async fn connect(
        config: &RecognizerConfig,
    ) -> Result<(Self, mpsc::Receiver<RecognizerEvent>), AsrError> {
        let url = build_stream_url(config)?;

        let mut request = url.as_str().into_client_request()?;
        if !config.api_key.is_empty() {
            request.headers_mut().insert(
                "Authorization",
                format!("Token {}", config.api_key)
                    .parse()
                    .map_err(|_| AsrError::StreamClosed)?,
            );
        }

        let (stream, _) = connect_async(request).await?;
        let (sink, mut source) = stream.split();

        let (event_tx, event_rx) = mpsc::channel(32);

        tokio::spawn(async move {
            while let Some(message) = source.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        if let Some(event) = parse_transcript_message(&text) {
                            if event_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                    }
                    Ok(Message::Close(_)) => {
                        let _ = event_tx.send(RecognizerEvent::Closed).await;
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let _ = event_tx.send(RecognizerEvent::Error(e.to_string())).await;
                        break;
                    }
                }
            }
        });

        Ok((Self { sink }, event_rx))
    }

    /// Forward one chunk of opaque audio bytes
    pub async fn send_audio(&mut self, bytes: Vec<u8>) -> Result<(), AsrError> {
        self.sink.send(Message::Binary(bytes)).await?;
        Ok(())
    }

    /// Close the stream when the call stops
    pub async fn close(&mut self) -> Result<(), AsrError> {
        self.sink.send(Message::Close(None)).await?;
        Ok(())
    }
}

/// Build the stream URL with the audio-config query string
fn build_stream_url(config: &RecognizerConfig) -> Result<Url, AsrError> {
    let mut url = Url::parse(&config.ws_url)?;
    url.query_pairs_mut()
        .append_pair("encoding", &config.encoding)
        .append_pair("sample_rate", &config.sample_rate_hz.to_string())
        .append_pair("language", &config.language)
        .append_pair("interim_results", "true");
    Ok(url)
}

/// Streaming result message from the recognizer
#[derive(Debug, Deserialize)]
struct StreamingResponse {
    #[serde(default)]
    is_final: bool,
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    transcript: String,
    #[serde(default)]
    confidence: Option<f32>,
}

/// Parse one text frame from the recognizer into an event.
///
/// Non-transcript frames (metadata, keepalives) yield None.
fn parse_transcript_message(text: &str) -> Option<RecognizerEvent> {
    let response: StreamingResponse = serde_json::from_str(text).ok()?;
    let alternative = response.channel.alternatives.into_iter().next()?;

    let mut utterance = Utterance::new(alternative.transcript, response.is_final);
    utterance.confidence = alternative.confidence;
    Some(RecognizerEvent::Transcript(utterance))
}
