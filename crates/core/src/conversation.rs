//! Conversation turns and capped history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    Caller,
    Assistant,
}

impl Speaker {
    /// Role name for generation-engine requests
    pub fn role(&self) -> &'static str {
        match self {
            Speaker::Caller => "user",
            Speaker::Assistant => "assistant",
        }
    }
}

/// One caller-speaks or assistant-replies entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn caller(text: impl Into<String>) -> Self {
        Self::new(Speaker::Caller, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Speaker::Assistant, text)
    }
}

/// Ordered conversation history for one call.
///
/// Append-only during the call's life; capped to bound memory and
/// generation-request size. Exceeding the cap drops the oldest turns.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
    max_turns: usize,
}

impl ConversationHistory {
    /// Create a history capped at `max_turns` entries
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_turns: max_turns.max(1),
        }
    }

    /// Append a turn, dropping the oldest if over the cap
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
        if self.turns.len() > self.max_turns {
            let excess = self.turns.len() - self.max_turns;
            self.turns.drain(..excess);
        }
    }

    /// All retained turns, oldest first
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// (speaker, text) pairs for generation requests
    pub fn as_pairs(&self) -> Vec<(Speaker, String)> {
        self.turns
            .iter()
            .map(|t| (t.speaker, t.text.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_append_order() {
        let mut history = ConversationHistory::new(10);
        history.push(Turn::caller("What are your opening hours?"));
        history.push(Turn::assistant("We're open 8 to 6"));

        let pairs = history.as_pairs();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0, Speaker::Caller);
        assert_eq!(pairs[1].1, "We're open 8 to 6");
    }

    #[test]
    fn test_history_cap_drops_oldest() {
        let mut history = ConversationHistory::new(3);
        for i in 0..5 {
            history.push(Turn::caller(format!("turn {}", i)));
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.turns()[0].text, "turn 2");
        assert_eq!(history.turns()[2].text, "turn 4");
    }

    #[test]
    fn test_speaker_roles() {
        assert_eq!(Speaker::Caller.role(), "user");
        assert_eq!(Speaker::Assistant.role(), "assistant");
    }
}
