//! # Step Handlers Module
//!
//! One handler per step type. A handler owns its step's validation rules, the
//! conversion of raw input into a typed [`Selection`], and the user-facing
//! texts; the shared sequencing (prompt rendering, validate/transform/record,
//! answered-prompt cleanup, acknowledgement) lives in the trait's default
//! methods so every step behaves the same way on the wire.
//!
//! The registry is an exhaustive match over the closed set of step types, so
//! a step type without a handler is a compile error rather than a runtime
//! lookup failure.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use crate::callback::{self, CodecError};
use crate::config::FlowConfig;
use crate::domain::DomainLookup;
use crate::errors::FlowError;
use crate::flow::definition::FlowStepDescriptor;
use crate::flow::model::{FlowStepType, Selection};
use crate::flow::store::UserFlowState;
use crate::transport::{MessagePort, PromptButton};

lazy_static! {
    static ref DATE_INPUT: Regex =
        Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("Date input pattern should be valid");
}

/// Replies accepted as an affirmative on the review step
const AFFIRMATIVE_INPUTS: [&str; 4] = ["confirm", "yes", "ok", "save"];

/// Shared collaborators handed to every handler call
pub struct FlowEnv {
    pub port: Arc<dyn MessagePort>,
    pub lookup: Arc<dyn DomainLookup>,
    pub config: FlowConfig,
}

/// Outcome of handling one user input for a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Input recorded; the flow may advance
    Accepted,
    /// Input refused; the flow stays on the same step
    Rejected,
}

/// Behavior of a single flow step.
///
/// Implementations provide the synchronous pieces (validate, transform,
/// texts); the async orchestration comes from the default methods and is only
/// overridden where a step presents itself differently, as the review step
/// does.
#[async_trait]
pub trait StepHandler: Send + Sync {
    fn step_type(&self) -> FlowStepType;

    /// Whether the raw input is acceptable for this step right now
    fn validate_input(&self, raw: &str, state: &UserFlowState, lookup: &dyn DomainLookup) -> bool;

    /// Convert validated input into its typed selection.
    ///
    /// Returns `None` only for input that `validate_input` would refuse; the
    /// default orchestration treats that as an invariant violation.
    fn transform_input(&self, raw: &str, state: &UserFlowState) -> Option<Selection>;

    /// Corrective message sent when validation refuses the input
    fn rejection_text(&self, raw: &str, state: &UserFlowState) -> String;

    /// Acknowledgement sent after the selection is recorded
    fn confirmation_text(&self, selection: &Selection, state: &UserFlowState) -> String;

    /// Present the step: render its prompt, attach option buttons, and
    /// remember the sent message id for later cleanup.
    async fn on_enter_step(
        &self,
        state: &mut UserFlowState,
        descriptor: &FlowStepDescriptor,
        env: &FlowEnv,
    ) -> Result<(), FlowError> {
        let text = descriptor.render_prompt(state.context());
        let options = env.lookup.valid_options(self.step_type(), state.context());
        let buttons = option_buttons(self.step_type(), &options)?;
        let message = env
            .port
            .send_prompt(state.conversation(), &text, buttons.as_deref())
            .await?;
        state.record_prompt_message(self.step_type(), message);
        Ok(())
    }

    /// Run one user input through the step.
    ///
    /// Rejected input sends a corrective message and leaves the state
    /// untouched. Accepted input records the selection, deletes the answered
    /// prompt (tolerating failures per the configured cleanup policy), and
    /// sends the acknowledgement. A cleanup failure the policy does not
    /// tolerate surfaces with the prompt still tracked, so the retry can
    /// delete it.
    async fn on_user_input(
        &self,
        raw: &str,
        state: &mut UserFlowState,
        env: &FlowEnv,
    ) -> Result<StepOutcome, FlowError> {
        if !self.validate_input(raw, state, env.lookup.as_ref()) {
            debug!(
                conversation = %state.conversation(),
                step = %self.step_type(),
                "Rejected step input"
            );
            let text = self.rejection_text(raw, state);
            env.port
                .send_prompt(state.conversation(), &text, None)
                .await?;
            return Ok(StepOutcome::Rejected);
        }

        let selection = self.transform_input(raw, state).ok_or_else(|| {
            FlowError::Invariant(format!(
                "validated input was refused by transform on step {}",
                self.step_type()
            ))
        })?;
        let acknowledgement = self.confirmation_text(&selection, state);
        state.record_selection(selection);

        if let Some(message) = state.prompt_message(self.step_type()) {
            if let Err(err) = env.port.delete_message(state.conversation(), message).await {
                if env.config.cleanup.tolerates(&err) {
                    warn!(
                        conversation = %state.conversation(),
                        %message,
                        error = %err,
                        "Ignoring prompt cleanup failure"
                    );
                } else {
                    return Err(err.into());
                }
            }
            state.take_prompt_message(self.step_type());
        }

        env.port
            .send_prompt(state.conversation(), &acknowledgement, None)
            .await?;
        Ok(StepOutcome::Accepted)
    }
}

/// Calendar-date step: a suggested-date button or a typed `yyyy-mm-dd` date
pub struct DateStep;

#[async_trait]
impl StepHandler for DateStep {
    fn step_type(&self) -> FlowStepType {
        FlowStepType::Date
    }

    fn validate_input(&self, raw: &str, _state: &UserFlowState, _lookup: &dyn DomainLookup) -> bool {
        let raw = raw.trim();
        DATE_INPUT.is_match(raw) && NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok()
    }

    fn transform_input(&self, raw: &str, _state: &UserFlowState) -> Option<Selection> {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .ok()
            .map(Selection::Date)
    }

    fn rejection_text(&self, _raw: &str, _state: &UserFlowState) -> String {
        "🤔 I couldn't read that as a date. Please type it as yyyy-mm-dd, like 2025-06-01, or tap one of the suggested dates.".to_string()
    }

    fn confirmation_text(&self, selection: &Selection, _state: &UserFlowState) -> String {
        format!("📅 Date set to {}.", selection.display())
    }
}

/// Seating-area step: must match one of the venue's areas by display name;
/// the recorded selection carries the canonical name
pub struct AreaStep;

#[async_trait]
impl StepHandler for AreaStep {
    fn step_type(&self) -> FlowStepType {
        FlowStepType::Area
    }

    fn validate_input(&self, raw: &str, state: &UserFlowState, lookup: &dyn DomainLookup) -> bool {
        lookup.validate_domain_value(FlowStepType::Area, raw.trim(), state.context())
    }

    fn transform_input(&self, raw: &str, state: &UserFlowState) -> Option<Selection> {
        state
            .context()
            .canonical_area(raw.trim())
            .map(|canonical| Selection::Area(canonical.to_string()))
    }

    fn rejection_text(&self, raw: &str, state: &UserFlowState) -> String {
        let areas = state
            .context()
            .areas
            .iter()
            .map(|area| area.display.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "🤔 We don't have \"{}\" as a seating area. Available areas: {areas}.",
            raw.trim()
        )
    }

    fn confirmation_text(&self, selection: &Selection, state: &UserFlowState) -> String {
        format!("🪑 {} it is.", area_display(selection, state))
    }
}

/// Seating-time step: one of the venue's offered `HH:MM` slots
pub struct TimeStep;

#[async_trait]
impl StepHandler for TimeStep {
    fn step_type(&self) -> FlowStepType {
        FlowStepType::Time
    }

    fn validate_input(&self, raw: &str, state: &UserFlowState, lookup: &dyn DomainLookup) -> bool {
        lookup.validate_domain_value(FlowStepType::Time, raw.trim(), state.context())
    }

    fn transform_input(&self, raw: &str, _state: &UserFlowState) -> Option<Selection> {
        NaiveTime::parse_from_str(raw.trim(), "%H:%M")
            .ok()
            .map(Selection::Time)
    }

    fn rejection_text(&self, raw: &str, state: &UserFlowState) -> String {
        let slots = state
            .context()
            .time_slots
            .iter()
            .map(|slot| slot.format("%H:%M").to_string())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "🤔 \"{}\" isn't a time we offer. Available times: {slots}.",
            raw.trim()
        )
    }

    fn confirmation_text(&self, selection: &Selection, _state: &UserFlowState) -> String {
        format!("🕐 Noted, {}.", selection.display())
    }
}

/// Party-size step: a typed count of guests within the venue's table limit
pub struct PartySizeStep;

#[async_trait]
impl StepHandler for PartySizeStep {
    fn step_type(&self) -> FlowStepType {
        FlowStepType::PartySize
    }

    fn validate_input(&self, raw: &str, state: &UserFlowState, lookup: &dyn DomainLookup) -> bool {
        lookup.validate_domain_value(FlowStepType::PartySize, raw.trim(), state.context())
    }

    fn transform_input(&self, raw: &str, _state: &UserFlowState) -> Option<Selection> {
        raw.trim().parse::<u32>().ok().map(Selection::PartySize)
    }

    fn rejection_text(&self, raw: &str, state: &UserFlowState) -> String {
        format!(
            "🤔 \"{}\" doesn't work as a party size. Send a figure between 1 and {}.",
            raw.trim(),
            state.context().max_party_size
        )
    }

    fn confirmation_text(&self, selection: &Selection, _state: &UserFlowState) -> String {
        match selection {
            Selection::PartySize(1) => "👥 A table for one.".to_string(),
            _ => format!("👥 A table for {}.", selection.display()),
        }
    }
}

/// Review step: shows the collected selections and waits for an affirmative
/// reply or the confirm button
pub struct ConfirmStep;

#[async_trait]
impl StepHandler for ConfirmStep {
    fn step_type(&self) -> FlowStepType {
        FlowStepType::Confirm
    }

    fn validate_input(&self, raw: &str, _state: &UserFlowState, _lookup: &dyn DomainLookup) -> bool {
        let normalized = raw.trim().to_lowercase();
        AFFIRMATIVE_INPUTS.contains(&normalized.as_str())
    }

    fn transform_input(&self, _raw: &str, _state: &UserFlowState) -> Option<Selection> {
        Some(Selection::Confirmed)
    }

    fn rejection_text(&self, _raw: &str, _state: &UserFlowState) -> String {
        "🤔 Tap ✅ Confirm or reply \"yes\" to book, or send /cancel to start over.".to_string()
    }

    fn confirmation_text(&self, _selection: &Selection, state: &UserFlowState) -> String {
        format!(
            "✅ Your table at {} is booked. See you soon!",
            state.context().venue
        )
    }

    /// The review prompt carries the summary of everything collected so far
    async fn on_enter_step(
        &self,
        state: &mut UserFlowState,
        descriptor: &FlowStepDescriptor,
        env: &FlowEnv,
    ) -> Result<(), FlowError> {
        let mut text = descriptor.render_prompt(state.context());
        for line in summary_lines(state) {
            text.push('\n');
            text.push_str(&line);
        }
        let payload =
            callback::encode(FlowStepType::Confirm.tag(), "confirm").map_err(codec_invariant)?;
        let buttons = vec![PromptButton::new("✅ Confirm", payload)];
        let message = env
            .port
            .send_prompt(state.conversation(), &text, Some(&buttons))
            .await?;
        state.record_prompt_message(self.step_type(), message);
        Ok(())
    }
}

/// The engine's fixed step registry
pub fn handler_for(step: FlowStepType) -> &'static dyn StepHandler {
    match step {
        FlowStepType::Date => &DateStep,
        FlowStepType::Area => &AreaStep,
        FlowStepType::Time => &TimeStep,
        FlowStepType::PartySize => &PartySizeStep,
        FlowStepType::Confirm => &ConfirmStep,
    }
}

/// One button per offered value, payload-encoded under the step's tag.
///
/// Steps without offered values take free-typed input and get no keyboard.
fn option_buttons(
    step: FlowStepType,
    options: &[String],
) -> Result<Option<Vec<PromptButton>>, FlowError> {
    if options.is_empty() {
        return Ok(None);
    }
    let mut buttons = Vec::with_capacity(options.len());
    for option in options {
        let payload = callback::encode(step.tag(), option).map_err(codec_invariant)?;
        buttons.push(PromptButton::new(option.clone(), payload));
    }
    Ok(Some(buttons))
}

fn codec_invariant(err: CodecError) -> FlowError {
    FlowError::Invariant(format!("callback payload rejected: {err}"))
}

/// One summary line per recorded selection, in flow order
fn summary_lines(state: &UserFlowState) -> Vec<String> {
    state
        .definition()
        .step_types()
        .filter_map(|step| {
            state.selection(step).map(|selection| match selection {
                Selection::Area(_) => {
                    format!("• {}: {}", step.label(), area_display(selection, state))
                }
                _ => format!("• {}: {}", step.label(), selection.display()),
            })
        })
        .collect()
}

/// Map a canonical area name back to its display form for messages
fn area_display(selection: &Selection, state: &UserFlowState) -> String {
    if let Selection::Area(canonical) = selection {
        if let Some(area) = state
            .context()
            .areas
            .iter()
            .find(|area| &area.canonical == canonical)
        {
            return area.display.clone();
        }
    }
    selection.display()
}
