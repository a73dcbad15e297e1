//! Turn state machine
//!
//! Drives one call through greet, capture, filler acknowledgment, reply
//! generation off the response path, mid-call injection and re-capture.
//! Webhook handlers call in synchronously and get a rendered document back
//! immediately; generation completes on a spawned task and re-enters
//! through `complete_generation`.

use std::sync::Arc;
use std::time::Duration;

use callflow_config::{CaptureMode, TurnPolicy};
use callflow_core::{Speaker, Turn, Utterance};
use callflow_llm::{generate_with_timeout, GenerationOutcome, ReplyGenerator};
use callflow_telephony::{render, speak_then_hangup, InjectionController, ScriptDirective};

use crate::session::TurnState;
use crate::store::SessionStore;

/// What remains to be done after a session mutation has been committed.
///
/// Produced under the session lock, acted on after it is released.
enum Followup {
    None,
    /// Utterance parked behind an in-flight generation; nothing to speak
    Queued,
    /// Call ended; remove the session after the grace period
    EvictAfterGrace,
    /// Start reply generation for sequence `seq`
    Generate {
        seq: u64,
        history: Vec<(Speaker, String)>,
        text: String,
    },
}

/// Per-call turn orchestrator.
///
/// Cheap to clone; clones share the session store and the in-flight
/// generation tasks.
#[derive(Clone)]
pub struct TurnOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<SessionStore>,
    generator: Arc<dyn ReplyGenerator>,
    injector: Arc<InjectionController>,
    policy: TurnPolicy,
    voice: String,
    /// URL captures post their transcript to; absolute so that injected
    /// documents resolve it too
    capture_action: String,
    generation_timeout: Duration,
}

impl TurnOrchestrator {
    pub fn new(
        store: Arc<SessionStore>,
        generator: Arc<dyn ReplyGenerator>,
        injector: Arc<InjectionController>,
        policy: TurnPolicy,
        voice: impl Into<String>,
        capture_action: impl Into<String>,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                generator,
                injector,
                policy,
                voice: voice.into(),
                capture_action: capture_action.into(),
                generation_timeout,
            }),
        }
    }

    /// Answer a new call: greet the caller and open the first capture.
    ///
    /// A duplicate start webhook for a call already past greeting leaves
    /// the session untouched; only the response document is re-rendered.
    pub fn call_started(&self, call_id: &str) -> String {
        self.inner.store.update(call_id, |session| {
            if session.state == TurnState::Greeting {
                session.state = TurnState::AwaitingSpeech;
            }
        });
        tracing::info!(call_id = %call_id, "Call started");

        render(
            &[
                ScriptDirective::speak(&self.inner.policy.greeting),
                self.open_capture(),
            ],
            &self.inner.voice,
        )
    }

    /// Handle a captured utterance, returning the synchronous response
    /// document.
    ///
    /// Always returns immediately: a non-empty utterance gets the filler
    /// acknowledgment while generation runs on a spawned task.
    pub fn utterance_received(&self, call_id: &str, utterance: Utterance) -> String {
        let (directives, followup) = self.apply_utterance(call_id, &utterance);
        let twiml = render(&directives, &self.inner.voice);
        self.run_followup(call_id, followup);
        twiml
    }

    /// Handle an utterance recognized from a media stream.
    ///
    /// There is no synchronous response window on this path, so the
    /// resulting document is delivered through the injection controller.
    pub async fn streamed_utterance(&self, call_id: &str, utterance: Utterance) {
        let (directives, followup) = self.apply_utterance(call_id, &utterance);

        if !matches!(followup, Followup::Queued) {
            let twiml = render(&directives, &self.inner.voice);
            let _ = self.inner.injector.inject(call_id, &twiml).await;
        }

        self.run_followup(call_id, followup);
    }

    /// Handle call teardown: invalidate any in-flight generation and
    /// schedule eviction.
    pub fn call_ended(&self, call_id: &str) {
        self.inner.store.update(call_id, |session| {
            session.cancel_generation();
            session.queued.clear();
            session.state = TurnState::Ended;
        });
        tracing::info!(call_id = %call_id, "Call ended");
        self.schedule_eviction(call_id);
    }

    /// Number of live call sessions
    pub fn session_count(&self) -> usize {
        self.inner.store.count()
    }

    /// Apply one utterance to the session under its lock, producing the
    /// directives to speak and the work left for after the lock is
    /// released.
    fn apply_utterance(
        &self,
        call_id: &str,
        utterance: &Utterance,
    ) -> (Vec<ScriptDirective>, Followup) {
        let policy = &self.inner.policy;

        self.inner.store.update(call_id, |session| {
            match session.state {
                TurnState::Ended => {
                    tracing::debug!(call_id = %call_id, "Utterance after call end, ignoring");
                    (vec![ScriptDirective::Hangup], Followup::None)
                }

                TurnState::Processing | TurnState::Injecting => {
                    if utterance.is_empty() {
                        // Filler already played; keep the capture open
                        (self.capture_only(), Followup::Queued)
                    } else {
                        session.no_input_count = 0;
                        session.queued.push_back(utterance.clone());
                        tracing::debug!(
                            call_id = %call_id,
                            queued = session.queued.len(),
                            "Utterance queued behind in-flight generation"
                        );
                        (self.capture_only(), Followup::Queued)
                    }
                }

                TurnState::Greeting | TurnState::AwaitingSpeech => {
                    if utterance.is_empty() {
                        session.no_input_count += 1;
                        if session.no_input_count >= policy.max_no_input_retries {
                            tracing::info!(
                                call_id = %call_id,
                                retries = session.no_input_count,
                                "No input after repeated prompts, ending call"
                            );
                            session.cancel_generation();
                            session.state = TurnState::Ended;
                            (
                                speak_then_hangup(&policy.goodbye),
                                Followup::EvictAfterGrace,
                            )
                        } else {
                            (
                                vec![ScriptDirective::speak(&policy.reprompt), self.open_capture()],
                                Followup::None,
                            )
                        }
                    } else {
                        session.no_input_count = 0;
                        // History snapshot excludes the turn being answered
                        let history = session.history.as_pairs();
                        session.history.push(Turn::caller(utterance.text.clone()));
                        let seq = session.begin_generation();
                        session.state = TurnState::Processing;
                        (
                            vec![ScriptDirective::speak(&policy.filler), self.open_capture()],
                            Followup::Generate {
                                seq,
                                history,
                                text: utterance.text.clone(),
                            },
                        )
                    }
                }
            }
        })
    }

    fn run_followup(&self, call_id: &str, followup: Followup) {
        match followup {
            Followup::None | Followup::Queued => {}
            Followup::EvictAfterGrace => self.schedule_eviction(call_id),
            Followup::Generate { seq, history, text } => {
                self.spawn_generation(call_id.to_string(), seq, history, text);
            }
        }
    }

    /// Run one bounded generation on its own task, substituting the
    /// fallback phrase on timeout or failure.
    fn spawn_generation(
        &self,
        call_id: String,
        seq: u64,
        history: Vec<(Speaker, String)>,
        text: String,
    ) {
        let this = self.clone();
        tokio::spawn(async move {
            let outcome = generate_with_timeout(
                this.inner.generator.as_ref(),
                &history,
                &text,
                this.inner.generation_timeout,
            )
            .await;

            let reply = match outcome {
                GenerationOutcome::Reply(reply) => reply,
                GenerationOutcome::TimedOut | GenerationOutcome::Failed(_) => {
                    this.inner.policy.fallback.clone()
                }
            };

            this.complete_generation(&call_id, seq, reply).await;
        });
    }

    /// Land a finished generation: record the reply, inject it into the
    /// live call, then either re-open capture or end the call.
    ///
    /// A result whose sequence number is no longer current (the call ended
    /// or a newer generation superseded it) is discarded without side
    /// effects.
    async fn complete_generation(&self, call_id: &str, seq: u64, reply: String) {
        let staged = self.inner.store.update(call_id, |session| {
            if !session.generation_is_current(seq) {
                return None;
            }

            session.history.push(Turn::assistant(reply.clone()));
            session.state = TurnState::Injecting;

            let terminal = self.reply_ends_call(&reply);
            let directives = if terminal {
                speak_then_hangup(&reply)
            } else {
                vec![ScriptDirective::speak(&reply), self.open_capture()]
            };
            Some((render(&directives, &self.inner.voice), terminal))
        });

        let Some((twiml, terminal)) = staged else {
            tracing::debug!(call_id = %call_id, seq, "Discarding stale generation result");
            return;
        };

        // A dropped injection is already logged; the call continues and
        // the caller's next utterance opens a fresh cycle.
        let _ = self.inner.injector.inject(call_id, &twiml).await;

        let followup = self.inner.store.update(call_id, |session| {
            // The call may have ended while the injection was in flight;
            // Ended is terminal and must not be resurrected.
            if session.state == TurnState::Ended {
                return Followup::None;
            }

            session.pending_generation = None;

            if terminal {
                session.queued.clear();
                session.state = TurnState::Ended;
                return Followup::EvictAfterGrace;
            }

            match session.queued.pop_front() {
                Some(next) => {
                    let history = session.history.as_pairs();
                    session.history.push(Turn::caller(next.text.clone()));
                    let next_seq = session.begin_generation();
                    session.state = TurnState::Processing;
                    Followup::Generate {
                        seq: next_seq,
                        history,
                        text: next.text,
                    }
                }
                None => {
                    session.state = TurnState::AwaitingSpeech;
                    Followup::None
                }
            }
        });

        self.run_followup(call_id, followup);
    }

    /// Does this reply contain an end marker, ending the call after it is
    /// spoken?
    fn reply_ends_call(&self, reply: &str) -> bool {
        let lowered = reply.to_lowercase();
        self.inner
            .policy
            .end_markers
            .iter()
            .any(|marker| lowered.contains(&marker.to_lowercase()))
    }

    /// The capture directive for the configured acquisition style
    fn open_capture(&self) -> ScriptDirective {
        let policy = &self.inner.policy;
        match policy.capture_mode {
            CaptureMode::Gather => ScriptDirective::capture(
                policy.capture_timeout_seconds,
                &self.inner.capture_action,
            ),
            CaptureMode::Record => ScriptDirective::Record {
                max_length_seconds: policy.record_max_length_seconds,
                transcribe_callback: self.inner.capture_action.clone(),
            },
        }
    }

    fn capture_only(&self) -> Vec<ScriptDirective> {
        vec![self.open_capture()]
    }

    fn schedule_eviction(&self, call_id: &str) {
        let store = Arc::clone(&self.inner.store);
        let call_id = call_id.to_string();
        let grace = Duration::from_secs(self.inner.policy.eviction_grace_seconds);

        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            store.evict(&call_id);
        });
    }
}
