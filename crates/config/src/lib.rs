//! Configuration for the call orchestrator
//!
//! Settings are layered: built-in defaults, then an optional config file,
//! then `CALLFLOW__*` environment variables.

pub mod settings;

pub use settings::{
    CaptureMode, GenerationConfig, ServerConfig, Settings, SpeechConfig, TelephonyConfig,
    TurnPolicy,
};

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
