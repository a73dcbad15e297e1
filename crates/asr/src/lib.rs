//! Utterance acquisition
//!
//! Two interchangeable strategies, selected by deployment mode:
//! - callback mode: the gateway transcribes recorded audio itself and posts
//!   the final text to a completion webhook (pure payload mapping);
//! - streaming mode: per-call audio chunks are fed to a streaming
//!   recognizer; interim results are logged and the final transcript of each
//!   utterance is delivered to the orchestrator.

pub mod callback;
pub mod collector;
pub mod recognizer;

pub use callback::TranscriptionCallback;
pub use collector::TurnCollector;
pub use recognizer::{RecognizerConfig, RecognizerEvent, WsRecognizer};

use thiserror::Error;

/// Acquisition errors.
///
/// Never fatal to a call: a failed recognizer yields no utterance and the
/// call proceeds to a no-input retry.
#[derive(Error, Debug)]
pub enum AsrError {
    #[error("Recognizer connection failed: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Invalid recognizer endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("Recognizer stream closed")]
    StreamClosed,
}
