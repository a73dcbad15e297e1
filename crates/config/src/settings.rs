//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Telephony gateway configuration
    #[serde(default)]
    pub telephony: TelephonyConfig,

    /// Streaming speech recognizer configuration
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Reply generation configuration
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Turn orchestration policy
    #[serde(default)]
    pub turn: TurnPolicy,
}

impl Settings {
    /// Load settings from an optional file plus `CALLFLOW__*` env overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }

        let settings: Settings = builder
            .add_source(Environment::with_prefix("CALLFLOW").separator("__"))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.turn.max_no_input_retries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "turn.max_no_input_retries".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        if self.turn.max_history_turns == 0 {
            return Err(ConfigError::InvalidValue {
                field: "turn.max_history_turns".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        if self.generation.timeout_ms < 500 {
            return Err(ConfigError::InvalidValue {
                field: "generation.timeout_ms".to_string(),
                message: "timeout too low (minimum 500ms)".to_string(),
            });
        }

        if self.telephony.account_sid.is_empty() {
            tracing::warn!("telephony.account_sid is empty; mid-call injection will fail");
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Publicly reachable base URL, used in rendered capture actions
    #[serde(default = "default_external_url")]
    pub external_url: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    10000
}
fn default_external_url() -> String {
    "http://localhost:10000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            external_url: default_external_url(),
        }
    }
}

/// Telephony gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelephonyConfig {
    /// Gateway account identifier
    #[serde(default)]
    pub account_sid: String,

    /// Gateway auth token (set via CALLFLOW__TELEPHONY__AUTH_TOKEN)
    #[serde(default)]
    pub auth_token: String,

    /// REST API base for live-call updates
    #[serde(default = "default_telephony_api_base")]
    pub api_base: String,

    /// Voice used for rendered speech
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Delay before the single injection retry, in milliseconds
    #[serde(default = "default_injection_retry_delay_ms")]
    pub injection_retry_delay_ms: u64,
}

fn default_telephony_api_base() -> String {
    "https://api.twilio.com/2010-04-01".to_string()
}
fn default_voice() -> String {
    "Polly.Joanna".to_string()
}
fn default_injection_retry_delay_ms() -> u64 {
    500
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            api_base: default_telephony_api_base(),
            voice: default_voice(),
            injection_retry_delay_ms: default_injection_retry_delay_ms(),
        }
    }
}

/// Streaming speech recognizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Recognizer WebSocket endpoint
    #[serde(default = "default_speech_ws_url")]
    pub ws_url: String,

    /// Recognizer API key (set via CALLFLOW__SPEECH__API_KEY)
    #[serde(default)]
    pub api_key: String,

    /// Audio encoding of the inbound media stream
    #[serde(default = "default_encoding")]
    pub encoding: String,

    /// Sample rate of the inbound media stream
    #[serde(default = "default_sample_rate")]
    pub sample_rate_hz: u32,

    /// Recognition language
    #[serde(default = "default_language")]
    pub language: String,

    /// Act on interim (non-final) transcripts instead of waiting for finals
    #[serde(default)]
    pub act_on_interim: bool,
}

fn default_speech_ws_url() -> String {
    "wss://api.deepgram.com/v1/listen".to_string()
}
fn default_encoding() -> String {
    "mulaw".to_string()
}
fn default_sample_rate() -> u32 {
    8000
}
fn default_language() -> String {
    "en-US".to_string()
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            ws_url: default_speech_ws_url(),
            api_key: String::new(),
            encoding: default_encoding(),
            sample_rate_hz: default_sample_rate(),
            language: default_language(),
            act_on_interim: false,
        }
    }
}

/// Reply generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Chat-completions API base
    #[serde(default = "default_generation_api_base")]
    pub api_base: String,

    /// API key (set via CALLFLOW__GENERATION__API_KEY)
    #[serde(default)]
    pub api_key: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// System prompt prepended to every request
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Hard timeout for one generation, in milliseconds
    #[serde(default = "default_generation_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_generation_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_system_prompt() -> String {
    "You are a helpful assistant for a landscaping business. \
     Answer questions politely and clearly. Keep responses short; \
     you are on a phone call."
        .to_string()
}
fn default_generation_timeout_ms() -> u64 {
    6000
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_base: default_generation_api_base(),
            api_key: String::new(),
            model: default_model(),
            system_prompt: default_system_prompt(),
            timeout_ms: default_generation_timeout_ms(),
        }
    }
}

/// How caller speech is captured after a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Inline speech capture; the gateway posts the transcript to the
    /// capture action synchronously
    #[default]
    Gather,
    /// Record audio and transcribe it out of band; the transcript arrives
    /// later on the same callback
    Record,
}

/// Turn orchestration policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnPolicy {
    /// Greeting spoken on first contact
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Reprompt spoken after an empty capture
    #[serde(default = "default_reprompt")]
    pub reprompt: String,

    /// Filler acknowledgment spoken while the reply is generated
    #[serde(default = "default_filler")]
    pub filler: String,

    /// Reply substituted when generation times out or fails
    #[serde(default = "default_fallback")]
    pub fallback: String,

    /// Goodbye spoken before hanging up
    #[serde(default = "default_goodbye")]
    pub goodbye: String,

    /// Empty captures tolerated before the call is politely ended
    #[serde(default = "default_max_no_input")]
    pub max_no_input_retries: u32,

    /// Capture style used for every prompt
    #[serde(default)]
    pub capture_mode: CaptureMode,

    /// Seconds the gateway waits for speech in a capture
    #[serde(default = "default_capture_timeout")]
    pub capture_timeout_seconds: u32,

    /// Maximum recording length in record capture mode
    #[serde(default = "default_record_max_length")]
    pub record_max_length_seconds: u32,

    /// History cap per call; oldest turns are dropped beyond this
    #[serde(default = "default_max_history_turns")]
    pub max_history_turns: usize,

    /// Markers that make a reply end the call after it is spoken
    #[serde(default = "default_end_markers")]
    pub end_markers: Vec<String>,

    /// Grace period before an ended session is evicted, in seconds
    #[serde(default = "default_eviction_grace")]
    pub eviction_grace_seconds: u64,

    /// Idle timeout after which an inactive session is evicted, in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,

    /// Interval between idle-session sweeps, in seconds
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
}

fn default_greeting() -> String {
    "Hello! This is your virtual assistant. How can I help you today?".to_string()
}
fn default_reprompt() -> String {
    "Sorry, I didn't hear anything. Could you say that again?".to_string()
}
fn default_filler() -> String {
    "One moment please.".to_string()
}
fn default_fallback() -> String {
    "I'm sorry, I didn't catch that. Could you please repeat?".to_string()
}
fn default_goodbye() -> String {
    "Thanks for calling. Goodbye!".to_string()
}
fn default_max_no_input() -> u32 {
    3
}
fn default_capture_timeout() -> u32 {
    5
}
fn default_record_max_length() -> u32 {
    10
}
fn default_max_history_turns() -> usize {
    20
}
fn default_end_markers() -> Vec<String> {
    vec!["goodbye".to_string()]
}
fn default_eviction_grace() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    300
}
fn default_cleanup_interval() -> u64 {
    60
}

impl Default for TurnPolicy {
    fn default() -> Self {
        Self {
            greeting: default_greeting(),
            reprompt: default_reprompt(),
            filler: default_filler(),
            fallback: default_fallback(),
            goodbye: default_goodbye(),
            max_no_input_retries: default_max_no_input(),
            capture_mode: CaptureMode::default(),
            capture_timeout_seconds: default_capture_timeout(),
            record_max_length_seconds: default_record_max_length(),
            max_history_turns: default_max_history_turns(),
            end_markers: default_end_markers(),
            eviction_grace_seconds: default_eviction_grace(),
            idle_timeout_seconds: default_idle_timeout(),
            cleanup_interval_seconds: default_cleanup_interval(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.turn.max_no_input_retries, 3);
        assert_eq!(settings.turn.capture_mode, CaptureMode::Gather);
        assert!(!settings.speech.act_on_interim);
    }

    #[test]
    fn test_zero_retries_rejected() {
        let mut settings = Settings::default();
        settings.turn.max_no_input_retries = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_low_timeout_rejected() {
        let mut settings = Settings::default();
        settings.generation.timeout_ms = 100;
        assert!(settings.validate().is_err());
    }
}
