//! Per-call session state

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use callflow_core::{ConversationHistory, Utterance};

/// Turn orchestrator states.
///
/// Transitions are monotonic apart from the explicit re-capture loop
/// (`Injecting` back to `AwaitingSpeech`); `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// First contact; greeting not yet rendered
    Greeting,
    /// Waiting for the next caller utterance
    AwaitingSpeech,
    /// Filler sent, reply generation in flight
    Processing,
    /// Reply ready, injection in flight
    Injecting,
    /// Terminal; evicted after a grace period
    Ended,
}

/// State tracked for one live phone call from answer to hangup
#[derive(Debug)]
pub struct CallSession {
    /// Opaque call identifier, stable for the call's lifetime
    pub call_id: String,

    /// Current state-machine position
    pub state: TurnState,

    /// Ordered conversation history, capped
    pub history: ConversationHistory,

    /// Consecutive empty captures; reset on any non-empty utterance
    pub no_input_count: u32,

    /// Sequence number of the generation currently in flight, if any.
    /// Guards against overlapping generations for the same call.
    pub pending_generation: Option<u64>,

    /// Utterances that arrived while a reply was in flight
    pub queued: VecDeque<Utterance>,

    pub created_at: Instant,
    pub last_activity: Instant,

    generation_seq: u64,
}

impl CallSession {
    pub fn new(call_id: impl Into<String>, max_history_turns: usize) -> Self {
        let now = Instant::now();
        Self {
            call_id: call_id.into(),
            state: TurnState::Greeting,
            history: ConversationHistory::new(max_history_turns),
            no_input_count: 0,
            pending_generation: None,
            queued: VecDeque::new(),
            created_at: now,
            last_activity: now,
            generation_seq: 0,
        }
    }

    /// Update last activity
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Check if the session has been idle past `timeout`
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.elapsed() > timeout
    }

    /// Start a new generation, returning its sequence number
    pub fn begin_generation(&mut self) -> u64 {
        self.generation_seq += 1;
        self.pending_generation = Some(self.generation_seq);
        self.generation_seq
    }

    /// Is the completed generation `seq` still the one we are waiting for?
    pub fn generation_is_current(&self, seq: u64) -> bool {
        self.pending_generation == Some(seq)
    }

    /// Invalidate any in-flight generation so its late result is discarded
    pub fn cancel_generation(&mut self) {
        self.generation_seq += 1;
        self.pending_generation = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_starts_in_greeting() {
        let session = CallSession::new("CA1", 20);
        assert_eq!(session.state, TurnState::Greeting);
        assert_eq!(session.no_input_count, 0);
        assert!(session.pending_generation.is_none());
    }

    #[test]
    fn test_generation_sequence_guard() {
        let mut session = CallSession::new("CA1", 20);

        let seq = session.begin_generation();
        assert!(session.generation_is_current(seq));

        session.cancel_generation();
        assert!(!session.generation_is_current(seq));

        let next = session.begin_generation();
        assert!(next > seq);
        assert!(session.generation_is_current(next));
    }
}
