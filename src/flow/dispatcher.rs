//! # Flow Dispatcher Module
//!
//! Entry point of the engine: routes inbound conversation events to the
//! active flow's current step handler and drives the step pointer forward on
//! accepted input. Owns the flow lifecycle around the steps: starting,
//! explicit abandonment, idle expiry, and the completion hand-off.
//!
//! The per-conversation lock is held for the whole handling of one event, so
//! a conversation's events are strictly serialized.

use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, warn};

use crate::callback::CallbackPayload;
use crate::domain::DomainContext;
use crate::errors::FlowError;
use crate::flow::definition::{FlowDefinition, FlowStepDescriptor};
use crate::flow::steps::{handler_for, FlowEnv, StepOutcome};
use crate::flow::store::{Advance, FlowStateStore, UserFlowState};
use crate::transport::{CompletionSink, ConversationId, MessageId};

/// One event arriving from the conversation surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Free-typed user text
    Text {
        conversation: ConversationId,
        text: String,
    },
    /// A pressed prompt button, payload already decoded
    Button {
        conversation: ConversationId,
        /// Message the pressed button was attached to
        prompt_message: MessageId,
        payload: CallbackPayload,
    },
}

/// What dispatching one event did to the conversation's flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Input accepted; the flow moved to its next step
    Advanced,
    /// Input refused; the flow stayed on the same step
    Rejected,
    /// Input accepted on the last step; the flow finished
    Completed,
    /// A stale button press with no effect
    Ignored,
    /// The conversation has no flow in progress
    NoActiveFlow,
}

/// Drives every active flow. One instance serves all conversations.
pub struct FlowDispatcher {
    store: FlowStateStore,
    env: FlowEnv,
    sink: Arc<dyn CompletionSink>,
}

impl FlowDispatcher {
    pub fn new(env: FlowEnv, sink: Arc<dyn CompletionSink>) -> Self {
        Self {
            store: FlowStateStore::new(),
            env,
            sink,
        }
    }

    /// Begin a flow for the conversation, presenting its first step.
    ///
    /// A flow already in progress for the conversation is replaced; its
    /// outstanding prompts are deleted best-effort.
    pub async fn start_flow(
        &self,
        conversation: ConversationId,
        definition: Arc<FlowDefinition>,
        context: DomainContext,
    ) -> Result<(), FlowError> {
        let state = UserFlowState::new(conversation, definition, context);
        let (handle, displaced) = self.store.begin(state);

        if let Some(displaced) = displaced {
            let mut old = displaced.lock().await;
            if let Err(err) = self.cleanup_prompts(&mut old).await {
                warn!(%conversation, error = %err, "Failed to clean up replaced flow's prompts");
            }
        }

        let mut state = handle.lock().await;
        let descriptor = state
            .current_step()
            .cloned()
            .ok_or_else(|| FlowError::Invariant("started flow has no first step".to_string()))?;
        info!(%conversation, venue = %state.context().venue, "Flow started");
        handler_for(descriptor.step)
            .on_enter_step(&mut state, &descriptor, &self.env)
            .await
    }

    /// Route one inbound event to the conversation's active flow
    pub async fn dispatch(&self, event: InboundEvent) -> Result<DispatchOutcome, FlowError> {
        match event {
            InboundEvent::Text { conversation, text } => {
                self.dispatch_text(conversation, &text).await
            }
            InboundEvent::Button {
                conversation,
                prompt_message,
                payload,
            } => {
                self.dispatch_button(conversation, prompt_message, payload)
                    .await
            }
        }
    }

    async fn dispatch_text(
        &self,
        conversation: ConversationId,
        text: &str,
    ) -> Result<DispatchOutcome, FlowError> {
        let Some(handle) = self.store.get(conversation) else {
            debug!(%conversation, "Text arrived with no flow in progress");
            return Ok(DispatchOutcome::NoActiveFlow);
        };
        let mut state = handle.lock().await;
        state.touch();
        self.run_step(&handle, &mut state, text).await
    }

    async fn dispatch_button(
        &self,
        conversation: ConversationId,
        prompt_message: MessageId,
        payload: CallbackPayload,
    ) -> Result<DispatchOutcome, FlowError> {
        let Some(handle) = self.store.get(conversation) else {
            debug!(%conversation, "Button pressed with no flow in progress");
            return Ok(DispatchOutcome::NoActiveFlow);
        };
        let mut state = handle.lock().await;
        state.touch();

        let descriptor = self.current_descriptor(&state)?;
        if payload.action != descriptor.step.tag() {
            debug!(
                %conversation,
                action = %payload.action,
                expected = %descriptor.step.tag(),
                "Ignoring button for a step that is no longer current"
            );
            return Ok(DispatchOutcome::Ignored);
        }
        if let Some(live) = state.prompt_message(descriptor.step) {
            if live != prompt_message {
                debug!(
                    %conversation,
                    pressed = %prompt_message,
                    %live,
                    "Ignoring button from a superseded prompt"
                );
                return Ok(DispatchOutcome::Ignored);
            }
        }

        self.run_step(&handle, &mut state, &payload.value).await
    }

    /// Explicitly cancel the conversation's flow; returns whether one existed
    pub async fn abandon_flow(&self, conversation: ConversationId) -> Result<bool, FlowError> {
        let Some(handle) = self.store.remove(conversation) else {
            return Ok(false);
        };
        let mut state = handle.lock().await;
        self.cleanup_prompts(&mut state).await?;
        info!(%conversation, "Flow abandoned");
        Ok(true)
    }

    /// Evict flows idle past the configured timeout, deleting their prompts.
    ///
    /// Returns how many flows were expired. Cleanup failures are logged; the
    /// sweep keeps going.
    pub async fn expire_idle(&self) -> usize {
        let expired = self.store.evict_idle(self.env.config.idle_timeout());
        let count = expired.len();
        for handle in expired {
            let mut state = handle.lock().await;
            let conversation = state.conversation();
            match self.cleanup_prompts(&mut state).await {
                Ok(()) => info!(%conversation, "Expired idle flow"),
                Err(err) => {
                    error!(%conversation, error = %err, "Prompt cleanup failed for expired flow")
                }
            }
        }
        count
    }

    /// Whether the conversation currently has a flow in progress
    pub fn has_active_flow(&self, conversation: ConversationId) -> bool {
        self.store.contains(conversation)
    }

    /// Number of flows currently in progress
    pub fn active_flows(&self) -> usize {
        self.store.active_count()
    }

    /// Run one raw input against the current step and advance on acceptance
    async fn run_step(
        &self,
        handle: &Arc<AsyncMutex<UserFlowState>>,
        state: &mut UserFlowState,
        raw: &str,
    ) -> Result<DispatchOutcome, FlowError> {
        let descriptor = self.current_descriptor(state)?;
        let handler = handler_for(descriptor.step);

        match handler.on_user_input(raw, state, &self.env).await? {
            StepOutcome::Rejected => Ok(DispatchOutcome::Rejected),
            StepOutcome::Accepted => match state.advance_step() {
                Advance::Next(next) => {
                    handler_for(next.step)
                        .on_enter_step(state, &next, &self.env)
                        .await?;
                    Ok(DispatchOutcome::Advanced)
                }
                Advance::Complete => {
                    self.complete(handle, state).await?;
                    Ok(DispatchOutcome::Completed)
                }
            },
        }
    }

    /// Hand the finished flow's selections to the completion sink.
    ///
    /// Only the completing flow's own store entry is removed, and it is
    /// removed before the sink runs: completion fires at most once, and a
    /// flow displaced by a restart mid-dispatch cannot take its
    /// replacement's entry with it.
    async fn complete(
        &self,
        handle: &Arc<AsyncMutex<UserFlowState>>,
        state: &mut UserFlowState,
    ) -> Result<(), FlowError> {
        let conversation = state.conversation();
        self.store.remove_if_current(conversation, handle);
        let selections = state.take_selections();
        info!(%conversation, selections = selections.len(), "Flow completed");
        self.sink
            .flow_complete(conversation, selections)
            .await
            .map_err(|err| FlowError::Completion(err.to_string()))
    }

    /// Best-effort deletion of every outstanding prompt, per cleanup policy
    async fn cleanup_prompts(&self, state: &mut UserFlowState) -> Result<(), FlowError> {
        let conversation = state.conversation();
        for (step, message) in state.drain_prompt_messages() {
            if let Err(err) = self.env.port.delete_message(conversation, message).await {
                if self.env.config.cleanup.tolerates(&err) {
                    warn!(
                        %conversation,
                        step = %step,
                        %message,
                        error = %err,
                        "Ignoring prompt cleanup failure"
                    );
                } else {
                    return Err(err.into());
                }
            }
        }
        Ok(())
    }

    fn current_descriptor(&self, state: &UserFlowState) -> Result<FlowStepDescriptor, FlowError> {
        state.current_step().cloned().ok_or_else(|| {
            FlowError::Invariant(format!(
                "flow for {} is past its last step but still stored",
                state.conversation()
            ))
        })
    }
}
