//! # Transport Seam Module
//!
//! The flow engine never talks to a chat backend directly. Everything
//! outbound goes through [`MessagePort`], and the completed flow is handed to
//! a [`CompletionSink`]. The Telegram implementations live in `crate::bot`;
//! tests substitute in-memory recorders.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::flow::model::{FlowStepType, Selection};

/// Stable identifier for one chat session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub i64);

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a message authored by the bot, tracked for later edit/delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub i64);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One inline button attached to a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptButton {
    /// Text shown to the user
    pub label: String,
    /// Encoded callback payload carried by the press
    pub payload: String,
}

impl PromptButton {
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

/// Transport failures, with "already gone" kept distinguishable so the
/// cleanup policy can tolerate it by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The referenced message no longer exists
    NotFound,
    /// Any other backend failure
    Api(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::NotFound => write!(f, "message not found"),
            TransportError::Api(msg) => write!(f, "api failure: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Outbound messaging operations required by the flow engine.
///
/// Each call maps to at most one backend action per step transition. A
/// `delete_message` on an already-deleted message reports
/// [`TransportError::NotFound`] rather than succeeding silently, leaving the
/// tolerate-or-surface decision to the caller's cleanup policy.
#[async_trait]
pub trait MessagePort: Send + Sync {
    /// Send a prompt (optionally with inline buttons), returning its message id
    async fn send_prompt(
        &self,
        conversation: ConversationId,
        text: &str,
        buttons: Option<&[PromptButton]>,
    ) -> Result<MessageId, TransportError>;

    /// Replace the text of a previously sent message
    async fn edit_message(
        &self,
        conversation: ConversationId,
        message: MessageId,
        new_text: &str,
    ) -> Result<(), TransportError>;

    /// Delete a previously sent message
    async fn delete_message(
        &self,
        conversation: ConversationId,
        message: MessageId,
    ) -> Result<(), TransportError>;
}

/// Receiver of a completed flow's accumulated selections.
///
/// Invoked exactly once per completed flow, after the terminal step. Turning
/// the selections into a durable record (and any user-visible receipt beyond
/// the step echoes) is this collaborator's business, not the engine's.
#[async_trait]
pub trait CompletionSink: Send + Sync {
    async fn flow_complete(
        &self,
        conversation: ConversationId,
        selections: HashMap<FlowStepType, Selection>,
    ) -> anyhow::Result<()>;
}
