//! Error type for the manager and listeners.

use std::io;

use thiserror::Error;

use crate::types::GameId;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("game id already in use: {0}")]
    DuplicateGame(GameId),

    #[error("session limit reached ({0} games)")]
    CapacityReached(usize),

    #[error("a game needs at least one player")]
    NoPlayers,

    #[error("{requested} players requested, at most {max} allowed")]
    TooManyPlayers { requested: usize, max: usize },

    #[error("failed to start session: {0}")]
    Spawn(#[source] io::Error),

    #[error("socket handoff failed: {0}")]
    Handoff(#[source] io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}
