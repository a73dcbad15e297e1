//! Turn orchestration
//!
//! The per-call state machine (greet, capture, filler acknowledgment,
//! asynchronous reply generation, mid-call injection, re-capture) and the
//! process-wide call session store it runs against.

pub mod session;
pub mod store;
pub mod turn;

pub use session::{CallSession, TurnState};
pub use store::SessionStore;
pub use turn::TurnOrchestrator;
