//! Events an engine pushes to its players.

use std::fmt;

use serde_json::{Map, Value};

use crate::engine::Seat;

pub trait GameEvent: fmt::Debug {
    /// Name the client sees as `event_type`.
    fn event_type(&self) -> &str;

    /// Named values of this event, rendered for `observer`.
    fn values(&self, observer: Seat) -> Map<String, Value>;
}
