//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;
use std::time::Duration;

use callflow_config::Settings;
use callflow_llm::ChatClient;
use callflow_orchestrator::{SessionStore, TurnOrchestrator};
use callflow_telephony::{InjectionController, TwilioCallUpdater};

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: Arc<Settings>,
    /// Call session store
    pub sessions: Arc<SessionStore>,
    /// Turn orchestrator
    pub orchestrator: TurnOrchestrator,
}

impl AppState {
    /// Wire up the orchestrator and its collaborators from settings
    pub fn new(config: Settings) -> Self {
        let sessions = Arc::new(SessionStore::new(
            config.turn.max_history_turns,
            Duration::from_secs(config.turn.idle_timeout_seconds),
            Duration::from_secs(config.turn.cleanup_interval_seconds),
        ));

        let generator = Arc::new(ChatClient::new(
            config.generation.api_base.clone(),
            config.generation.api_key.clone(),
            config.generation.model.clone(),
            config.generation.system_prompt.clone(),
        ));

        let updater = Arc::new(TwilioCallUpdater::new(
            config.telephony.account_sid.clone(),
            config.telephony.auth_token.clone(),
            config.telephony.api_base.clone(),
        ));
        let injector = Arc::new(InjectionController::new(
            updater,
            Duration::from_millis(config.telephony.injection_retry_delay_ms),
        ));

        let capture_action = format!(
            "{}/transcription",
            config.server.external_url.trim_end_matches('/')
        );

        let orchestrator = TurnOrchestrator::new(
            Arc::clone(&sessions),
            generator,
            injector,
            config.turn.clone(),
            config.telephony.voice.clone(),
            capture_action,
            Duration::from_millis(config.generation.timeout_ms),
        );

        Self {
            config: Arc::new(config),
            sessions,
            orchestrator,
        }
    }
}
