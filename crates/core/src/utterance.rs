//! Utterance types for recognized caller speech

use serde::{Deserialize, Serialize};

/// One recognized unit of caller speech delivered as text.
///
/// Transient: an utterance is consumed by the orchestrator to produce a
/// history entry and is not persisted beyond that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utterance {
    /// Transcribed text (possibly empty)
    pub text: String,

    /// Is this a final result for the current turn?
    pub is_final: bool,

    /// Confidence score (0.0 - 1.0), when the recognizer reports one
    pub confidence: Option<f32>,
}

impl Utterance {
    /// Create a new utterance
    pub fn new(text: impl Into<String>, is_final: bool) -> Self {
        Self {
            text: text.into(),
            is_final,
            confidence: None,
        }
    }

    /// Create a final utterance
    pub fn final_result(text: impl Into<String>) -> Self {
        Self::new(text, true)
    }

    /// Create an interim (non-final) utterance
    pub fn interim(text: impl Into<String>) -> Self {
        Self::new(text, false)
    }

    /// An empty final utterance, the shape of a no-input capture
    pub fn empty() -> Self {
        Self::final_result("")
    }

    /// Set confidence
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Check if the utterance carries no speech
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_utterance() {
        let utt = Utterance::final_result("hello there").with_confidence(0.92);
        assert!(utt.is_final);
        assert!(!utt.is_empty());
        assert_eq!(utt.confidence, Some(0.92));
    }

    #[test]
    fn test_whitespace_is_empty() {
        assert!(Utterance::final_result("   ").is_empty());
        assert!(Utterance::empty().is_empty());
    }
}
