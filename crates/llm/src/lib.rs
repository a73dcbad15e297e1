//! Reply generation adapter
//!
//! Thin wrapper around the text-generation engine: conversation context in,
//! one reply out, always raced against a hard timeout. Retry policy belongs
//! to the orchestrator, never here.

pub mod openai;

pub use openai::ChatClient;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use callflow_core::Speaker;

/// Generation errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Generation request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Generation engine returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Generation response was empty")]
    EmptyResponse,
}

/// Outcome of one bounded generation attempt
#[derive(Debug)]
pub enum GenerationOutcome {
    /// The engine produced a reply within the budget
    Reply(String),
    /// The budget elapsed first
    TimedOut,
    /// The engine failed
    Failed(LlmError),
}

/// Text-generation engine interface
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Generate one reply from the running context plus the new utterance.
    ///
    /// Implementations must not retry internally.
    async fn generate(
        &self,
        history: &[(Speaker, String)],
        utterance: &str,
    ) -> Result<String, LlmError>;
}

/// Race a generation call against the timeout.
///
/// Never blocks past the budget and never returns an absent reply: the
/// caller substitutes its fallback phrase on `TimedOut` or `Failed`.
pub async fn generate_with_timeout(
    generator: &dyn ReplyGenerator,
    history: &[(Speaker, String)],
    utterance: &str,
    timeout: Duration,
) -> GenerationOutcome {
    match tokio::time::timeout(timeout, generator.generate(history, utterance)).await {
        Ok(Ok(reply)) => GenerationOutcome::Reply(reply),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Reply generation failed");
            GenerationOutcome::Failed(e)
        }
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Reply generation timed out");
            GenerationOutcome::TimedOut
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowGenerator {
        delay: Duration,
    }

    #[async_trait]
    impl ReplyGenerator for SlowGenerator {
        async fn generate(
            &self,
            _history: &[(Speaker, String)],
            _utterance: &str,
        ) -> Result<String, LlmError> {
            tokio::time::sleep(self.delay).await;
            Ok("done".to_string())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl ReplyGenerator for FailingGenerator {
        async fn generate(
            &self,
            _history: &[(Speaker, String)],
            _utterance: &str,
        ) -> Result<String, LlmError> {
            Err(LlmError::EmptyResponse)
        }
    }

    #[tokio::test]
    async fn test_reply_within_budget() {
        let generator = SlowGenerator {
            delay: Duration::from_millis(5),
        };
        let outcome =
            generate_with_timeout(&generator, &[], "hi", Duration::from_millis(500)).await;
        assert!(matches!(outcome, GenerationOutcome::Reply(ref r) if r == "done"));
    }

    #[tokio::test]
    async fn test_timeout_yields_timed_out() {
        tokio::time::pause();
        let generator = SlowGenerator {
            delay: Duration::from_secs(60),
        };
        let outcome = generate_with_timeout(&generator, &[], "hi", Duration::from_secs(1)).await;
        assert!(matches!(outcome, GenerationOutcome::TimedOut));
    }

    #[tokio::test]
    async fn test_failure_yields_failed() {
        let outcome =
            generate_with_timeout(&FailingGenerator, &[], "hi", Duration::from_secs(1)).await;
        assert!(matches!(outcome, GenerationOutcome::Failed(_)));
    }
}
