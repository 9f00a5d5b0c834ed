//! Unified error types surfaced by the session API.
//!
//! Wraps channel plumbing failures and setup errors from the combat model
//! so clients can bubble them up with consistent context.

use thiserror::Error;

pub use lanefall_core::SetupError;

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("player command channel closed")]
    CommandChannelClosed,

    #[error(transparent)]
    Setup(#[from] SetupError),
}
