//! Callflow Server
//!
//! Webhook and media-stream endpoints for the telephony gateway.

pub mod http;
pub mod media;
pub mod state;

pub use http::create_router;
pub use state::AppState;

use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Media stream protocol error: {0}")]
    Protocol(String),
}
