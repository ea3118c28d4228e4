//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules for better organization:
//! - `message_handler`: Handles incoming commands and free-typed text
//! - `callback_handler`: Handles inline keyboard callback queries
//! - `port`: The Telegram-backed message port used by the flow engine

use std::sync::Arc;

use crate::flow::definition::FlowDefinition;
use crate::flow::dispatcher::FlowDispatcher;
use crate::venues::VenueCatalog;

pub mod callback_handler;
pub mod message_handler;
pub mod port;

// Re-export main handler functions for use in main.rs
pub use callback_handler::callback_handler;
pub use message_handler::message_handler;
pub use port::TelegramPort;

/// Callback action tag for venue picker buttons; step tags cover the rest
pub const VENUE_ACTION: &str = "venue";

/// Everything the handlers share across updates
pub struct BotContext {
    pub flows: FlowDispatcher,
    pub catalog: VenueCatalog,
    pub definition: Arc<FlowDefinition>,
}
