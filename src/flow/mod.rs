//! Flow engine for multi-step data-collection conversations
//!
//! This module is split into several submodules for better organization:
//! - `model`: Step types and the typed selection values they produce
//! - `definition`: Ordered step descriptors making up one flow
//! - `steps`: Per-step handlers and their shared orchestration
//! - `store`: Per-conversation flow state and the concurrent state pool
//! - `dispatcher`: Event routing, lifecycle, and completion hand-off

pub mod definition;
pub mod dispatcher;
pub mod model;
pub mod steps;
pub mod store;

// Re-export the types callers wire together in main.rs
pub use definition::{FlowDefinition, FlowStepDescriptor};
pub use dispatcher::{DispatchOutcome, FlowDispatcher, InboundEvent};
pub use model::{FlowStepType, Selection};
pub use steps::{handler_for, FlowEnv, StepHandler, StepOutcome};
pub use store::{FlowStateStore, UserFlowState};
