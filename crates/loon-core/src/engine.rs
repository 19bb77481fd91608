//! The seam between a rules engine and the session that hosts it.
//!
//! The engine never sees sockets or player ids. It addresses players by
//! [`Seat`] and talks to them through a [`GameInterface`], which the
//! session implements on top of its player connections.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::event::GameEvent;
use crate::messages::SelectRequest;
use crate::option::GameOption;
use crate::selection::{single_minimum, Choice, Selection};

/// Engine-side handle for one player: its position at the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Seat(pub usize);

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seat {}", self.0)
    }
}

/// Parameters a game is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupInfo {
    pub num_players: usize,
}

impl Default for SetupInfo {
    fn default() -> Self {
        Self { num_players: 1 }
    }
}

/// One player's side of a selection round-trip.
///
/// `select` blocks until the player produced a structurally valid answer
/// and returns the raw text they sent.
pub trait PlayerIo {
    fn select(&self, request: &SelectRequest) -> String;
}

/// What a running engine can ask of its players.
pub trait GameInterface {
    /// Let `seat` pick between `minimum` (default 1) and `maximum`
    /// (default: all) of `options`, or one of `additional` before any pick.
    fn select_options(
        &self,
        seat: Seat,
        options: Vec<GameOption>,
        minimum: Option<usize>,
        maximum: Option<usize>,
        additional: Vec<GameOption>,
        reason: Option<&str>,
    ) -> Selection<GameOption>;

    /// Single pick. Returns `None` only when nothing could be picked at all.
    fn select_option(
        &self,
        seat: Seat,
        options: Vec<GameOption>,
        optional: bool,
        additional: Vec<GameOption>,
        reason: Option<&str>,
    ) -> Option<Choice<GameOption>> {
        let minimum = single_minimum(optional);
        self.select_options(seat, options, Some(minimum), Some(1), additional, reason)
            .into_choice()
    }

    /// Tell `seat` that `event` happened. `first` marks the event's first
    /// occurrence as opposed to an echo of it.
    fn notify_event(&self, seat: Seat, event: &dyn GameEvent, first: bool);
}

/// A rules engine. Runs to completion on its own thread.
pub trait GameEngine: Send {
    fn run(&mut self, io: &dyn GameInterface) -> Result<(), EngineError>;
}
