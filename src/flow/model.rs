//! Step-type and selection value model for the reservation flow.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Identifies one kind of data-collection step.
///
/// The ordering of steps within a flow is defined by the
/// [`FlowDefinition`](crate::flow::definition::FlowDefinition), never by this
/// enum, which is why it deliberately implements no ordering traits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStepType {
    Date,
    Area,
    Time,
    PartySize,
    Confirm,
}

impl FlowStepType {
    /// Stable wire tag used as the action half of callback payloads
    pub fn tag(&self) -> &'static str {
        match self {
            FlowStepType::Date => "date",
            FlowStepType::Area => "area",
            FlowStepType::Time => "time",
            FlowStepType::PartySize => "party_size",
            FlowStepType::Confirm => "confirm",
        }
    }

    /// Inverse of [`tag`](Self::tag); `None` for non-step actions
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "date" => Some(FlowStepType::Date),
            "area" => Some(FlowStepType::Area),
            "time" => Some(FlowStepType::Time),
            "party_size" => Some(FlowStepType::PartySize),
            "confirm" => Some(FlowStepType::Confirm),
            _ => None,
        }
    }

    /// Human-readable name used in echoes and summaries
    pub fn label(&self) -> &'static str {
        match self {
            FlowStepType::Date => "Date",
            FlowStepType::Area => "Area",
            FlowStepType::Time => "Time",
            FlowStepType::PartySize => "Party size",
            FlowStepType::Confirm => "Confirmation",
        }
    }
}

impl std::fmt::Display for FlowStepType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// The typed value collected by a single step.
///
/// A `Selection` for step type T is only ever produced by T's handler's
/// `transform_input`, so each variant's shape is that handler's contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Selection {
    /// Calendar date, date-at-midnight semantics
    Date(NaiveDate),
    /// Canonical (internal) area name, resolved from the display name
    Area(String),
    /// Seating time
    Time(NaiveTime),
    /// Number of guests
    PartySize(u32),
    /// Terminal acknowledgement
    Confirmed,
}

impl Selection {
    /// The step type this selection belongs to
    pub fn step_type(&self) -> FlowStepType {
        match self {
            Selection::Date(_) => FlowStepType::Date,
            Selection::Area(_) => FlowStepType::Area,
            Selection::Time(_) => FlowStepType::Time,
            Selection::PartySize(_) => FlowStepType::PartySize,
            Selection::Confirmed => FlowStepType::Confirm,
        }
    }

    /// Short user-facing rendering, e.g. `2025-06-01` or `19:30`
    pub fn display(&self) -> String {
        match self {
            Selection::Date(date) => date.format("%Y-%m-%d").to_string(),
            Selection::Area(name) => name.clone(),
            Selection::Time(time) => time.format("%H:%M").to_string(),
            Selection::PartySize(size) => size.to_string(),
            Selection::Confirmed => "confirmed".to_string(),
        }
    }
}

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}
