//! Call session store
//!
//! Process-wide registry mapping call id to session state. The only mutable
//! shared resource in the subsystem; all mutation goes through the atomic
//! `update`. Within one call id mutations are linearized by the per-session
//! lock; across call ids no ordering is implied.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;

use crate::session::CallSession;

/// Concurrent call-session registry
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<CallSession>>>>,
    max_history_turns: usize,
    idle_timeout: Duration,
    cleanup_interval: Duration,
}

impl SessionStore {
    pub fn new(max_history_turns: usize, idle_timeout: Duration, cleanup_interval: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_history_turns,
            idle_timeout,
            cleanup_interval,
        }
    }

    /// Get a session by call id
    pub fn get(&self, call_id: &str) -> Option<Arc<Mutex<CallSession>>> {
        self.sessions.read().get(call_id).cloned()
    }

    /// Get or create the session for a call id.
    ///
    /// An unknown id (late event, evicted session) gets a fresh session
    /// rather than an error: the call is treated as new.
    pub fn get_or_create(&self, call_id: &str) -> Arc<Mutex<CallSession>> {
        if let Some(session) = self.get(call_id) {
            return session;
        }

        let mut sessions = self.sessions.write();
        sessions
            .entry(call_id.to_string())
            .or_insert_with(|| {
                tracing::info!(call_id = %call_id, "Created call session");
                Arc::new(Mutex::new(CallSession::new(call_id, self.max_history_turns)))
            })
            .clone()
    }

    /// Apply a mutation atomically to one call's session.
    ///
    /// The mutator runs under the session lock; callers must not block
    /// inside it.
    pub fn update<R>(&self, call_id: &str, mutator: impl FnOnce(&mut CallSession) -> R) -> R {
        let session = self.get_or_create(call_id);
        let mut guard = session.lock();
        let result = mutator(&mut guard);
        guard.touch();
        result
    }

    /// Remove a session
    pub fn evict(&self, call_id: &str) {
        if self.sessions.write().remove(call_id).is_some() {
            tracing::info!(call_id = %call_id, "Evicted call session");
        }
    }

    /// Number of live sessions
    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Remove sessions idle past the configured timeout
    pub fn cleanup_expired(&self) {
        let timeout = self.idle_timeout;
        let mut sessions = self.sessions.write();
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| s.lock().is_expired(timeout))
            .map(|(id, _)| id.clone())
            .collect();

        for id in expired {
            sessions.remove(&id);
            tracing::info!(call_id = %id, "Expired idle call session");
        }
    }

    /// Start a background task that periodically sweeps idle sessions.
    ///
    /// Returns a shutdown sender used to stop the task.
    pub fn start_cleanup_task(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let store = Arc::clone(self);
        let interval = store.cleanup_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let before = store.count();
                        store.cleanup_expired();
                        let after = store.count();
                        if before != after {
                            tracing::info!(
                                removed = before - after,
                                remaining = after,
                                "Session cleanup pass"
                            );
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("Session cleanup task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }
}
