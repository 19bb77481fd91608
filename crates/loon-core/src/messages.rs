//! Logical messages exchanged with a single player.
//!
//! These are transport-agnostic; the JSON wire shapes live in the
//! `loon-protocol` crate.

use serde_json::{Map, Value};

use crate::engine::Seat;
use crate::event::GameEvent;

/// "Choose from these" as the player sees it: labels only.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectRequest {
    /// Remaining candidate labels, plus the `DONE` sentinel once stopping
    /// is allowed.
    pub options: Vec<String>,

    /// Labels of the out-of-band extra options.
    pub additional_options: Vec<String>,

    pub reason: Option<String>,
}

/// An event already rendered for one observer.
///
/// Connections store events in this form so a replay sends exactly what
/// the first delivery sent.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub event_type: String,
    pub values: Map<String, Value>,
}

impl EventRecord {
    pub fn render(event: &dyn GameEvent, observer: Seat) -> Self {
        EventRecord {
            event_type: event.event_type().to_string(),
            values: event.values(observer),
        }
    }
}
