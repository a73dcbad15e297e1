//! Callback-mode acquisition
//!
//! The gateway buffers audio, transcribes it, and invokes a completion
//! webhook with the final text. Acquisition is a pure mapping from the
//! webhook payload to an utterance.

use serde::Deserialize;

use callflow_core::Utterance;

/// Transcription-completion webhook payload.
///
/// Gateways spell the transcript field differently depending on whether it
/// came from a recording transcription or an inline speech capture; both are
/// accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionCallback {
    #[serde(rename = "CallSid")]
    pub call_sid: String,

    #[serde(rename = "TranscriptionText", default)]
    pub transcription_text: Option<String>,

    #[serde(rename = "SpeechResult", default)]
    pub speech_result: Option<String>,

    #[serde(rename = "Confidence", default)]
    pub confidence: Option<f32>,
}

impl TranscriptionCallback {
    /// Map the payload to a final utterance.
    ///
    /// An absent transcript maps to an empty utterance, which the
    /// orchestrator treats as no-input.
    pub fn into_utterance(self) -> Utterance {
        let text = self
            .transcription_text
            .or(self.speech_result)
            .unwrap_or_default();

        let mut utterance = Utterance::final_result(text);
        utterance.confidence = self.confidence;
        utterance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcription_text_field() {
        let payload: TranscriptionCallback = serde_urlencoded_like(
            r#"{"CallSid":"CA1","TranscriptionText":"hello there"}"#,
        );
        let utt = payload.into_utterance();
        assert!(utt.is_final);
        assert_eq!(utt.text, "hello there");
    }

    #[test]
    fn test_speech_result_field() {
        let payload: TranscriptionCallback =
            serde_urlencoded_like(r#"{"CallSid":"CA1","SpeechResult":"hi","Confidence":0.81}"#);
        let utt = payload.into_utterance();
        assert_eq!(utt.text, "hi");
        assert_eq!(utt.confidence, Some(0.81));
    }

    #[test]
    fn test_absent_transcript_is_empty_utterance() {
        let payload: TranscriptionCallback = serde_urlencoded_like(r#"{"CallSid":"CA1"}"#);
        assert!(payload.into_utterance().is_empty());
    }

    fn serde_urlencoded_like(json: &str) -> TranscriptionCallback {
        serde_json::from_str(json).unwrap()
    }
}
