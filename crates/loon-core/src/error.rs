//! Error types for engines running inside a session.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A game was set up without any seats.
    #[error("game needs at least one player")]
    NoPlayers,

    /// Any other engine-internal failure.
    #[error("engine failure: {0}")]
    Internal(String),
}
