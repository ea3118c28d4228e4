//! # Flow State Store Module
//!
//! Owns the per-conversation flow state: which step is active, the selections
//! collected so far, and the ids of the bot's own prompt messages so they can
//! be edited or deleted later.
//!
//! # Concurrency
//!
//! States are pooled behind a `Mutex<HashMap<..., Arc<tokio::sync::Mutex<_>>>>`.
//! The outer lock guards the map only and is never held across an await; the
//! inner async lock is held by the dispatcher for the full handling of one
//! inbound event, so two events for the same conversation can never
//! interleave while distinct conversations proceed concurrently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use crate::domain::DomainContext;
use crate::flow::definition::{FlowDefinition, FlowStepDescriptor};
use crate::flow::model::{FlowStepType, Selection};
use crate::transport::{ConversationId, MessageId};

/// Result of advancing the step pointer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// The flow moved to this step
    Next(FlowStepDescriptor),
    /// The flow ran past its last step and is complete
    Complete,
}

/// Mutable state of one conversation's flow.
///
/// The step pointer is private: [`advance_step`](Self::advance_step) is its
/// only mutator and is called exactly once per accepted input.
#[derive(Debug)]
pub struct UserFlowState {
    conversation: ConversationId,
    definition: Arc<FlowDefinition>,
    context: DomainContext,
    current_index: usize,
    selections: HashMap<FlowStepType, Selection>,
    prompt_messages: HashMap<FlowStepType, MessageId>,
    last_activity: Instant,
}

impl UserFlowState {
    pub fn new(
        conversation: ConversationId,
        definition: Arc<FlowDefinition>,
        context: DomainContext,
    ) -> Self {
        Self {
            conversation,
            definition,
            context,
            current_index: 0,
            selections: HashMap::new(),
            prompt_messages: HashMap::new(),
            last_activity: Instant::now(),
        }
    }

    pub fn conversation(&self) -> ConversationId {
        self.conversation
    }

    /// The domain snapshot taken when this flow started
    pub fn context(&self) -> &DomainContext {
        &self.context
    }

    pub fn definition(&self) -> &FlowDefinition {
        &self.definition
    }

    /// Position of the active step within the definition
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Descriptor of the active step; `None` only after the flow completed
    pub fn current_step(&self) -> Option<&FlowStepDescriptor> {
        self.definition.step_at(self.current_index)
    }

    /// Record the selection produced by a step's `transform_input`.
    ///
    /// Keyed by the selection's own step type, so a value can never be filed
    /// under a foreign step.
    pub fn record_selection(&mut self, selection: Selection) {
        self.selections.insert(selection.step_type(), selection);
    }

    pub fn selection(&self, step: FlowStepType) -> Option<&Selection> {
        self.selections.get(&step)
    }

    pub fn selections(&self) -> &HashMap<FlowStepType, Selection> {
        &self.selections
    }

    /// Hand the accumulated selections to completion, leaving the map empty
    pub fn take_selections(&mut self) -> HashMap<FlowStepType, Selection> {
        std::mem::take(&mut self.selections)
    }

    /// Remember the message id of a step's rendered prompt
    pub fn record_prompt_message(&mut self, step: FlowStepType, message: MessageId) {
        self.prompt_messages.insert(step, message);
    }

    pub fn prompt_message(&self, step: FlowStepType) -> Option<MessageId> {
        self.prompt_messages.get(&step).copied()
    }

    /// Clear a step's prompt entry, returning the id for cleanup
    pub fn take_prompt_message(&mut self, step: FlowStepType) -> Option<MessageId> {
        self.prompt_messages.remove(&step)
    }

    /// Clear every outstanding prompt entry, for abandon/expiry cleanup
    pub fn drain_prompt_messages(&mut self) -> Vec<(FlowStepType, MessageId)> {
        self.prompt_messages.drain().collect()
    }

    /// Move the step pointer forward. The sole mutator of the pointer.
    pub fn advance_step(&mut self) -> Advance {
        self.current_index += 1;
        match self.definition.step_at(self.current_index) {
            Some(descriptor) => Advance::Next(descriptor.clone()),
            None => Advance::Complete,
        }
    }

    /// Refresh the inactivity clock; called for every dispatched event
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// How long this flow has been idle
    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }
}

/// Thread-safe pool of active flows keyed by conversation id.
pub struct FlowStateStore {
    flows: Mutex<HashMap<ConversationId, Arc<AsyncMutex<UserFlowState>>>>,
}

impl FlowStateStore {
    pub fn new() -> Self {
        Self {
            flows: Mutex::new(HashMap::new()),
        }
    }

    /// Install a freshly created flow state.
    ///
    /// Returns the handle for the new flow plus any displaced prior flow for
    /// the same conversation, so the caller can clean up its prompts.
    pub fn begin(
        &self,
        state: UserFlowState,
    ) -> (
        Arc<AsyncMutex<UserFlowState>>,
        Option<Arc<AsyncMutex<UserFlowState>>>,
    ) {
        let conversation = state.conversation();
        let handle = Arc::new(AsyncMutex::new(state));
        let displaced = {
            let mut flows = self.flows.lock().unwrap();
            flows.insert(conversation, Arc::clone(&handle))
        };
        debug!(%conversation, replaced = displaced.is_some(), "Flow state created");
        (handle, displaced)
    }

    /// Handle of the conversation's active flow, if any
    pub fn get(&self, conversation: ConversationId) -> Option<Arc<AsyncMutex<UserFlowState>>> {
        let flows = self.flows.lock().unwrap();
        flows.get(&conversation).map(Arc::clone)
    }

    /// Remove and return the conversation's flow, if any
    pub fn remove(&self, conversation: ConversationId) -> Option<Arc<AsyncMutex<UserFlowState>>> {
        let removed = {
            let mut flows = self.flows.lock().unwrap();
            flows.remove(&conversation)
        };
        if removed.is_some() {
            debug!(%conversation, "Flow state removed");
        }
        removed
    }

    /// Remove the conversation's entry only if it still is this exact flow.
    ///
    /// A flow finishing after it was displaced by a newer one must not take
    /// the newer flow's entry with it.
    pub fn remove_if_current(
        &self,
        conversation: ConversationId,
        handle: &Arc<AsyncMutex<UserFlowState>>,
    ) -> bool {
        let removed = {
            let mut flows = self.flows.lock().unwrap();
            let is_current = flows
                .get(&conversation)
                .is_some_and(|current| Arc::ptr_eq(current, handle));
            if is_current {
                flows.remove(&conversation);
            }
            is_current
        };
        if removed {
            debug!(%conversation, "Flow state removed");
        }
        removed
    }

    pub fn contains(&self, conversation: ConversationId) -> bool {
        let flows = self.flows.lock().unwrap();
        flows.contains_key(&conversation)
    }

    /// Number of currently active flows
    pub fn active_count(&self) -> usize {
        let flows = self.flows.lock().unwrap();
        flows.len()
    }

    /// Remove every flow idle longer than `max_idle`, returning the evicted
    /// handles so their prompts can be cleaned up.
    ///
    /// A flow whose lock is held is mid-dispatch and therefore not idle; it
    /// is skipped rather than waited on.
    pub fn evict_idle(&self, max_idle: Duration) -> Vec<Arc<AsyncMutex<UserFlowState>>> {
        let mut expired = Vec::new();
        {
            let mut flows = self.flows.lock().unwrap();
            flows.retain(|conversation, handle| {
                let idle = match handle.try_lock() {
                    Ok(state) => state.idle_for() >= max_idle,
                    Err(_) => false,
                };
                if idle {
                    debug!(%conversation, "Evicting idle flow");
                    expired.push(Arc::clone(handle));
                }
                !idle
            });
        }
        expired
    }
}

impl Default for FlowStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AreaOption;
    use chrono::NaiveDate;

    fn context() -> DomainContext {
        DomainContext {
            venue: "Trattoria Roma".to_string(),
            available_dates: vec![NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()],
            areas: vec![AreaOption::new("Main Hall", "main_hall")],
            time_slots: Vec::new(),
            max_party_size: 6,
        }
    }

    fn state(conversation: i64) -> UserFlowState {
        UserFlowState::new(
            ConversationId(conversation),
            Arc::new(FlowDefinition::reservation()),
            context(),
        )
    }

    #[test]
    fn test_advance_walks_definition_order() {
        let mut state = state(1);
        assert_eq!(state.current_index(), 0);
        assert_eq!(state.current_step().map(|d| d.step), Some(FlowStepType::Date));

        match state.advance_step() {
            Advance::Next(descriptor) => assert_eq!(descriptor.step, FlowStepType::Area),
            Advance::Complete => panic!("flow should not be complete after one step"),
        }
        assert_eq!(state.current_index(), 1);
    }

    #[test]
    fn test_advance_past_last_step_is_complete() {
        let mut state = state(1);
        for _ in 0..4 {
            assert!(matches!(state.advance_step(), Advance::Next(_)));
        }
        assert_eq!(state.advance_step(), Advance::Complete);
        assert!(state.current_step().is_none());
    }

    #[test]
    fn test_selection_keyed_by_own_step_type() {
        let mut state = state(1);
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        state.record_selection(Selection::Date(date));

        assert_eq!(
            state.selection(FlowStepType::Date),
            Some(&Selection::Date(date))
        );
        assert!(state.selection(FlowStepType::Area).is_none());
    }

    #[test]
    fn test_prompt_message_take_clears_entry() {
        let mut state = state(1);
        state.record_prompt_message(FlowStepType::Date, MessageId(42));

        assert_eq!(
            state.take_prompt_message(FlowStepType::Date),
            Some(MessageId(42))
        );
        assert_eq!(state.take_prompt_message(FlowStepType::Date), None);
    }

    #[test]
    fn test_store_begin_get_remove() {
        let store = FlowStateStore::new();
        let conversation = ConversationId(7);
        assert!(!store.contains(conversation));

        let (_, displaced) = store.begin(state(7));
        assert!(displaced.is_none());
        assert!(store.contains(conversation));
        assert_eq!(store.active_count(), 1);

        assert!(store.remove(conversation).is_some());
        assert!(!store.contains(conversation));
        assert!(store.remove(conversation).is_none());
    }

    #[test]
    fn test_store_begin_displaces_prior_flow() {
        let store = FlowStateStore::new();
        let (_, first) = store.begin(state(7));
        assert!(first.is_none());

        let (_, displaced) = store.begin(state(7));
        assert!(displaced.is_some());
        assert_eq!(store.active_count(), 1);
    }

    #[test]
    fn test_remove_if_current_spares_replacement() {
        let store = FlowStateStore::new();
        let conversation = ConversationId(7);
        let (old, _) = store.begin(state(7));
        let (new, displaced) = store.begin(state(7));
        assert!(displaced.is_some());

        // The displaced flow must not take its replacement's entry
        assert!(!store.remove_if_current(conversation, &old));
        assert!(store.contains(conversation));

        assert!(store.remove_if_current(conversation, &new));
        assert!(!store.contains(conversation));
    }

    #[test]
    fn test_evict_idle_removes_only_stale_flows() {
        let store = FlowStateStore::new();
        store.begin(state(1));
        store.begin(state(2));

        // Nothing is stale yet
        assert!(store.evict_idle(Duration::from_secs(60)).is_empty());
        assert_eq!(store.active_count(), 2);

        // With a zero threshold everything is stale
        let evicted = store.evict_idle(Duration::ZERO);
        assert_eq!(evicted.len(), 2);
        assert_eq!(store.active_count(), 0);
    }

    #[test]
    fn test_evict_idle_skips_locked_flows() {
        let store = FlowStateStore::new();
        let (handle, _) = store.begin(state(1));

        let guard = handle.try_lock().unwrap();
        assert!(store.evict_idle(Duration::ZERO).is_empty());
        assert_eq!(store.active_count(), 1);
        drop(guard);

        assert_eq!(store.evict_idle(Duration::ZERO).len(), 1);
    }
}
