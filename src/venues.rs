//! # Venue Catalog Module
//!
//! Built-in demo directory of bookable venues and an in-memory completion
//! sink. Real deployments would back both with external services; the
//! catalog gives the flow engine believable domain data to run against and
//! the log records what a finished flow produced.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Days, NaiveDate, NaiveTime};
use tracing::info;

use crate::domain::{AreaOption, DomainContext};
use crate::flow::model::{FlowStepType, Selection};
use crate::transport::{CompletionSink, ConversationId};

/// One bookable venue in the directory
#[derive(Debug, Clone)]
pub struct Venue {
    pub name: String,
    pub areas: Vec<AreaOption>,
    pub time_slots: Vec<NaiveTime>,
    pub max_party_size: u32,
    /// How many days ahead of today are offered as suggested dates
    pub booking_window_days: u32,
}

/// Directory of venues the bot can take reservations for
#[derive(Debug, Clone)]
pub struct VenueCatalog {
    venues: Vec<Venue>,
}

impl VenueCatalog {
    pub fn new(venues: Vec<Venue>) -> Self {
        Self { venues }
    }

    /// The demo directory used when no external venue source is wired in
    pub fn builtin() -> Self {
        Self::new(vec![
            Venue {
                name: "Trattoria Roma".to_string(),
                areas: vec![
                    AreaOption::new("Main Hall", "main_hall"),
                    AreaOption::new("Terrace", "terrace"),
                    AreaOption::new("Bar | Lounge", "bar_lounge"),
                ],
                time_slots: evening_slots(18, 21),
                max_party_size: 8,
                booking_window_days: 14,
            },
            Venue {
                name: "Harbour Grill".to_string(),
                areas: vec![
                    AreaOption::new("Waterfront Deck", "waterfront_deck"),
                    AreaOption::new("Dining Room", "dining_room"),
                ],
                time_slots: evening_slots(17, 22),
                max_party_size: 10,
                booking_window_days: 21,
            },
            Venue {
                name: "Café Verde".to_string(),
                areas: vec![
                    AreaOption::new("Garden", "garden"),
                    AreaOption::new("Inside", "inside"),
                ],
                time_slots: evening_slots(18, 20),
                max_party_size: 6,
                booking_window_days: 7,
            },
        ])
    }

    /// Venue names in directory order, for the venue chooser keyboard
    pub fn venue_names(&self) -> impl Iterator<Item = &str> {
        self.venues.iter().map(|venue| venue.name.as_str())
    }

    /// Look a venue up by its exact display name
    pub fn get(&self, name: &str) -> Option<&Venue> {
        self.venues.iter().find(|venue| venue.name == name)
    }

    /// Snapshot the venue's bookable options into a flow's domain context
    pub fn context_for(&self, venue: &str, today: NaiveDate) -> Option<DomainContext> {
        let venue = self.get(venue)?;
        let available_dates = (0..u64::from(venue.booking_window_days))
            .filter_map(|offset| today.checked_add_days(Days::new(offset)))
            .collect();
        Some(DomainContext {
            venue: venue.name.clone(),
            available_dates,
            areas: venue.areas.clone(),
            time_slots: venue.time_slots.clone(),
            max_party_size: venue.max_party_size,
        })
    }
}

/// Half-hourly slots from the opening hour up to and including the last
/// seating hour
fn evening_slots(first_hour: u32, last_hour: u32) -> Vec<NaiveTime> {
    let mut slots = Vec::new();
    for hour in first_hour..=last_hour {
        for minute in [0, 30] {
            if let Some(slot) = NaiveTime::from_hms_opt(hour, minute, 0) {
                slots.push(slot);
            }
        }
    }
    slots
}

/// One finished reservation as handed over by the flow engine
#[derive(Debug, Clone)]
pub struct CompletedReservation {
    pub conversation: ConversationId,
    pub selections: HashMap<FlowStepType, Selection>,
}

/// In-memory completion sink: keeps finished reservations and logs them.
///
/// Stands in for the persistence collaborator a production deployment would
/// plug in here.
#[derive(Debug, Default)]
pub struct ReservationLog {
    completed: Mutex<Vec<CompletedReservation>>,
}

impl ReservationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.lock().unwrap().len()
    }

    /// The most recently recorded reservation, if any
    pub fn last(&self) -> Option<CompletedReservation> {
        self.completed.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CompletionSink for ReservationLog {
    async fn flow_complete(
        &self,
        conversation: ConversationId,
        selections: HashMap<FlowStepType, Selection>,
    ) -> anyhow::Result<()> {
        let mut parts: Vec<String> = selections
            .iter()
            .map(|(step, selection)| format!("{}={}", step.tag(), selection.display()))
            .collect();
        parts.sort();
        info!(%conversation, reservation = %parts.join(" "), "Reservation recorded");

        let mut completed = self.completed.lock().unwrap();
        completed.push(CompletedReservation {
            conversation,
            selections,
        });
        Ok(())
    }
}
