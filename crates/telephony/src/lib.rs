//! Telephony gateway surface
//!
//! The script directive IR, the pure markup renderer, and the outbound
//! live-call update path (mid-call injection).

pub mod directive;
pub mod twiml;
pub mod update;

pub use directive::{speak_then_capture, speak_then_hangup, ScriptDirective};
pub use twiml::render;
pub use update::{CallUpdater, InjectionController, TwilioCallUpdater};

use thiserror::Error;

/// Telephony errors
#[derive(Error, Debug)]
pub enum TelephonyError {
    #[error("Gateway returned {status}: {message}")]
    Gateway { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
