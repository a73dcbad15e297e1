//! Core types for the call orchestrator
//!
//! Shared across all other crates:
//! - Utterance (one recognized unit of caller speech)
//! - Conversation turns and capped history

pub mod conversation;
pub mod utterance;

pub use conversation::{ConversationHistory, Speaker, Turn};
pub use utterance::Utterance;
