//! # Domain Lookup Module
//!
//! Read-only domain data consumed by step handlers: the valid areas, time
//! slots and size limits of the venue being booked. The data is captured as a
//! [`DomainContext`] snapshot when a flow starts and never re-fetched
//! mid-flow, so concurrent changes to the underlying venue data cannot make
//! an already-validated selection retroactively invalid.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::flow::model::FlowStepType;

/// One bookable area of a venue, as shown to the user and as stored internally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaOption {
    /// Name rendered on buttons and matched against typed input
    pub display: String,
    /// Canonical internal name recorded in the selection
    pub canonical: String,
}

impl AreaOption {
    pub fn new(display: impl Into<String>, canonical: impl Into<String>) -> Self {
        Self {
            display: display.into(),
            canonical: canonical.into(),
        }
    }
}

/// Snapshot of the domain data one flow validates against.
///
/// Built once at flow start from whatever the surrounding layer knows about
/// the target venue; the flow only ever reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainContext {
    /// Display name of the venue being booked, substituted into prompts
    pub venue: String,
    /// Dates offered as buttons on the date step (typed dates outside this
    /// list are still accepted; the date step validates syntax, not window)
    pub available_dates: Vec<NaiveDate>,
    /// Bookable areas
    pub areas: Vec<AreaOption>,
    /// Seating times offered by the venue
    pub time_slots: Vec<NaiveTime>,
    /// Largest party the venue accepts
    pub max_party_size: u32,
}

impl DomainContext {
    /// Resolve a display name to its canonical area name (exact match)
    pub fn canonical_area(&self, display: &str) -> Option<&str> {
        self.areas
            .iter()
            .find(|area| area.display == display)
            .map(|area| area.canonical.as_str())
    }
}

/// Domain-side validity queries for steps whose validity depends on loaded
/// venue data rather than pure syntax.
pub trait DomainLookup: Send + Sync {
    /// Values offered as buttons for a choice-style step
    fn valid_options(&self, step: FlowStepType, context: &DomainContext) -> Vec<String>;

    /// Whether a raw value is acceptable for the step under this context
    fn validate_domain_value(&self, step: FlowStepType, value: &str, context: &DomainContext)
        -> bool;
}

/// The default lookup: answers every query from the [`DomainContext`]
/// snapshot alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotLookup;

impl DomainLookup for SnapshotLookup {
    fn valid_options(&self, step: FlowStepType, context: &DomainContext) -> Vec<String> {
        match step {
            FlowStepType::Date => context
                .available_dates
                .iter()
                .map(|date| date.format("%Y-%m-%d").to_string())
                .collect(),
            FlowStepType::Area => context
                .areas
                .iter()
                .map(|area| area.display.clone())
                .collect(),
            FlowStepType::Time => context
                .time_slots
                .iter()
                .map(|slot| slot.format("%H:%M").to_string())
                .collect(),
            // Free-text step, no buttons
            FlowStepType::PartySize => Vec::new(),
            FlowStepType::Confirm => vec!["confirm".to_string()],
        }
    }

    fn validate_domain_value(
        &self,
        step: FlowStepType,
        value: &str,
        context: &DomainContext,
    ) -> bool {
        match step {
            FlowStepType::Area => context.areas.iter().any(|area| area.display == value),
            FlowStepType::Time => context
                .time_slots
                .iter()
                .any(|slot| slot.format("%H:%M").to_string() == value),
            FlowStepType::PartySize => value
                .parse::<u32>()
                .is_ok_and(|size| size >= 1 && size <= context.max_party_size),
            // Syntax-only steps carry no domain constraint
            FlowStepType::Date | FlowStepType::Confirm => true,
        }
    }
}
