//! Shared types for the game server.
//!
//! This module defines:
//! - id aliases for games and players
//! - channel aliases between sessions and socket writer tasks
//! - `Handoff`: a socket on its way into a session
//! - `EngineFactory`: how a session gets its rules engine

use std::net::TcpStream;
use std::sync::Arc;

use loon_core::{GameEngine, SetupInfo};
use loon_protocol::ServerMessage;
use tokio::sync::mpsc;

/// Game identifier chosen by whoever creates the game.
pub type GameId = String;

/// Player identifier issued at game creation. Authenticates a connection
/// to one seat of one game.
pub type PlayerId = String;

/// Outbound frames for one attached socket.
pub type OutboundTx = mpsc::UnboundedSender<ServerMessage>;
pub type OutboundRx = mpsc::UnboundedReceiver<ServerMessage>;

/// An authenticated socket and the player it belongs to.
///
/// The receiving session becomes the sole owner of `stream`.
#[derive(Debug)]
pub struct Handoff {
    pub player_id: PlayerId,
    pub stream: TcpStream,
}

/// Channel from the manager into one session.
pub type HandoffTx = mpsc::UnboundedSender<Handoff>;
pub type HandoffRx = mpsc::UnboundedReceiver<Handoff>;

/// Builds the engine for a new session.
pub type EngineFactory = Arc<dyn Fn(&SetupInfo) -> Box<dyn GameEngine> + Send + Sync>;
