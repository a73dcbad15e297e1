//! Per-turn transcript collection
//!
//! Filters the recognizer event stream down to the utterances the
//! orchestrator should see: interim results are logged but not acted upon
//! (unless configured otherwise), empty finals between turns are skipped,
//! and errors degrade to no utterance at all.

use callflow_core::Utterance;

use crate::recognizer::RecognizerEvent;

/// Collects recognizer events into orchestrator-ready utterances
#[derive(Debug, Clone)]
pub struct TurnCollector {
    act_on_interim: bool,
}

impl TurnCollector {
    pub fn new(act_on_interim: bool) -> Self {
        Self { act_on_interim }
    }

    /// Offer one recognizer event; returns an utterance when one should be
    /// delivered to the orchestrator.
    pub fn offer(&mut self, event: RecognizerEvent) -> Option<Utterance> {
        match event {
            RecognizerEvent::Transcript(utterance) => {
                if utterance.is_final {
                    if utterance.is_empty() {
                        tracing::debug!("Skipping empty final transcript");
                        return None;
                    }
                    return Some(utterance);
                }

                if self.act_on_interim && !utterance.is_empty() {
                    return Some(utterance);
                }

                tracing::debug!(text = %utterance.text, "Interim transcript");
                None
            }
            RecognizerEvent::Closed => {
                tracing::debug!("Recognizer stream closed");
                None
            }
            RecognizerEvent::Error(message) => {
                // Degrades to the no-input path; never terminates the call.
                tracing::warn!(error = %message, "Recognizer error, continuing without utterance");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_transcript_delivered() {
        let mut collector = TurnCollector::new(false);
        let utt = collector
            .offer(RecognizerEvent::Transcript(Utterance::final_result("hi")))
            .unwrap();
        assert_eq!(utt.text, "hi");
    }

    #[test]
    fn test_interims_logged_not_delivered() {
        let mut collector = TurnCollector::new(false);
        assert!(collector
            .offer(RecognizerEvent::Transcript(Utterance::interim("hi th")))
            .is_none());
    }

    #[test]
    fn test_interims_delivered_when_configured() {
        let mut collector = TurnCollector::new(true);
        assert!(collector
            .offer(RecognizerEvent::Transcript(Utterance::interim("hi th")))
            .is_some());
    }

    #[test]
    fn test_empty_finals_and_errors_skipped() {
        let mut collector = TurnCollector::new(false);
        assert!(collector
            .offer(RecognizerEvent::Transcript(Utterance::empty()))
            .is_none());
        assert!(collector
            .offer(RecognizerEvent::Error("socket reset".to_string()))
            .is_none());
    }
}
