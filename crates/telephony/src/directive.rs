//! Script directive intermediate representation
//!
//! The orchestrator emits ordered lists of these primitives; keeping the
//! next action as data rather than ad hoc markup strings is what lets the
//! state machine be tested without a live gateway.

/// One primitive call-control instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptDirective {
    /// Speak text to the caller
    Speak { text: String },

    /// Capture caller speech, posting the result to `action`
    Capture { timeout_seconds: u32, action: String },

    /// Record caller speech and transcribe it out of band,
    /// posting the transcript to `transcribe_callback`
    Record {
        max_length_seconds: u32,
        transcribe_callback: String,
    },

    /// Silence for a number of seconds
    Pause { seconds: u32 },

    /// Hand call control to another target
    Redirect { target: String },

    /// End the call
    Hangup,
}

impl ScriptDirective {
    pub fn speak(text: impl Into<String>) -> Self {
        ScriptDirective::Speak { text: text.into() }
    }

    pub fn capture(timeout_seconds: u32, action: impl Into<String>) -> Self {
        ScriptDirective::Capture {
            timeout_seconds,
            action: action.into(),
        }
    }
}

/// The speak-then-capture shape: closes the loop within one exchange
pub fn speak_then_capture(
    text: impl Into<String>,
    timeout_seconds: u32,
    action: impl Into<String>,
) -> Vec<ScriptDirective> {
    vec![
        ScriptDirective::speak(text),
        ScriptDirective::capture(timeout_seconds, action),
    ]
}

/// The call-ending shape: speak only, then hang up
pub fn speak_then_hangup(text: impl Into<String>) -> Vec<ScriptDirective> {
    vec![ScriptDirective::speak(text), ScriptDirective::Hangup]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speak_then_capture_shape() {
        let directives = speak_then_capture("Hello", 5, "/voice");
        assert_eq!(directives.len(), 2);
        assert!(matches!(directives[0], ScriptDirective::Speak { .. }));
        assert!(matches!(
            directives[1],
            ScriptDirective::Capture { timeout_seconds: 5, .. }
        ));
    }

    #[test]
    fn test_speak_then_hangup_shape() {
        let directives = speak_then_hangup("Goodbye");
        assert_eq!(directives[1], ScriptDirective::Hangup);
    }
}
