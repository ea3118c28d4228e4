//! # Flow Error Types Module
//!
//! This module defines the error types surfaced by the flow engine.
//! User-caused validation failures are never errors; they are reported as a
//! rejected step outcome and the conversation stays on the same step.

use crate::transport::TransportError;

/// Errors surfaced by the flow engine
#[derive(Debug, Clone)]
pub enum FlowError {
    /// Outbound messaging failures (send/edit/delete)
    Transport(TransportError),
    /// Completion hand-off failures
    Completion(String),
    /// Invariant violations (programming errors, not user input)
    Invariant(String),
}

impl std::fmt::Display for FlowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowError::Transport(err) => write!(f, "Transport error: {err}"),
            FlowError::Completion(msg) => write!(f, "Completion error: {msg}"),
            FlowError::Invariant(msg) => write!(f, "Invariant violation: {msg}"),
        }
    }
}

impl std::error::Error for FlowError {}

impl From<TransportError> for FlowError {
    fn from(err: TransportError) -> Self {
        FlowError::Transport(err)
    }
}
