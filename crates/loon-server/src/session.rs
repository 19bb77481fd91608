//! One running game.
//!
//! A session owns a player connection per seat and runs two things side by
//! side:
//! - the engine, on its own OS thread, blocking inside
//!   `PlayerConnection::select` whenever it needs input;
//! - an acceptor loop on the async runtime that takes handed-off sockets
//!   and attaches them to the matching connection.
//!
//! The session ends when the engine returns or panics, or when the
//! handoff source closes (the manager is gone).

use std::collections::HashMap;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use loon_core::demo::DraftGame;
use loon_core::{
    EventRecord, GameEngine, GameEvent, GameInterface, GameOption, Seat, Selection,
    SelectionEngine, SetupInfo,
};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Span};

use crate::connection::PlayerConnection;
use crate::transport;
use crate::types::{EngineFactory, GameId, Handoff, HandoffRx, PlayerId};

/// Time the last frames of a finished game get to reach the players.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything a session needs to start, in seat order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSpec {
    pub game_id: GameId,
    pub player_ids: Vec<PlayerId>,
    pub setup: SetupInfo,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    Finished,
    Failed(String),
    /// The handoff source closed while the engine was still running.
    Abandoned,
}

/// Where handed-off sockets come from.
#[derive(Debug)]
pub enum HandoffSource {
    /// Same process: the socket itself travels through a channel.
    Channel(HandoffRx),

    /// Session process: descriptors arrive over the control socket.
    #[cfg(unix)]
    Control(crate::handoff::FdReceiver),
}

impl HandoffSource {
    async fn next(&mut self) -> Option<Handoff> {
        match self {
            HandoffSource::Channel(rx) => rx.recv().await,
            #[cfg(unix)]
            HandoffSource::Control(receiver) => match receiver.recv().await {
                Ok(handoff) => handoff,
                Err(e) => {
                    error!(error = %e, "control channel failed");
                    None
                }
            },
        }
    }
}

/// The engine's view of the table.
pub struct SessionInterface {
    players: Vec<Arc<PlayerConnection>>,
    selection: SelectionEngine,
}

impl SessionInterface {
    pub fn new(players: Vec<Arc<PlayerConnection>>) -> Self {
        SessionInterface {
            players,
            selection: SelectionEngine::new(),
        }
    }
}

impl GameInterface for SessionInterface {
    fn select_options(
        &self,
        seat: Seat,
        options: Vec<GameOption>,
        minimum: Option<usize>,
        maximum: Option<usize>,
        additional: Vec<GameOption>,
        reason: Option<&str>,
    ) -> Selection<GameOption> {
        match self.players.get(seat.0) {
            Some(conn) => {
                self.selection
                    .select_options(conn.as_ref(), options, minimum, maximum, additional, reason)
            }
            None => {
                warn!(%seat, "selection for a seat outside the game");
                Selection::Picked(Vec::new())
            }
        }
    }

    fn notify_event(&self, seat: Seat, event: &dyn GameEvent, first: bool) {
        match self.players.get(seat.0) {
            Some(conn) => conn.notify(EventRecord::render(event, seat), first),
            None => warn!(%seat, "event for a seat outside the game"),
        }
    }
}

/// Engine factory for the bundled card draft.
pub fn draft_engine() -> EngineFactory {
    Arc::new(|setup: &SetupInfo| Box::new(DraftGame::new(setup)) as Box<dyn GameEngine>)
}

/// Run a session to its end.
pub async fn run_session(
    spec: SessionSpec,
    mut engine: Box<dyn GameEngine>,
    mut handoffs: HandoffSource,
) -> io::Result<SessionEnd> {
    let players: Vec<Arc<PlayerConnection>> = spec
        .player_ids
        .iter()
        .enumerate()
        .map(|(index, id)| {
            let conn = PlayerConnection::new(id.clone());
            conn.bind(Seat(index));
            Arc::new(conn)
        })
        .collect();

    let by_id: HashMap<PlayerId, Arc<PlayerConnection>> = players
        .iter()
        .map(|conn| (conn.player_id().to_string(), conn.clone()))
        .collect();

    let interface = SessionInterface::new(players.clone());
    let mut writers: Vec<JoinHandle<()>> = Vec::new();
    let (done_tx, mut done_rx) = oneshot::channel();
    let span = Span::current();

    // Not spawn_blocking: runtime shutdown must not wait on the players.
    thread::Builder::new()
        .name(format!("game-{}", spec.game_id))
        .spawn(move || {
            let _entered = span.enter();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| engine.run(&interface)));
            let end = match outcome {
                Ok(Ok(())) => SessionEnd::Finished,
                Ok(Err(e)) => SessionEnd::Failed(e.to_string()),
                Err(_) => SessionEnd::Failed("engine panicked".to_string()),
            };
            let _ = done_tx.send(end);
        })?;

    info!(game_id = %spec.game_id, players = spec.player_ids.len(), "session started");

    loop {
        tokio::select! {
            end = &mut done_rx => {
                let end = end.unwrap_or_else(|_| {
                    SessionEnd::Failed("engine thread vanished".to_string())
                });
                match &end {
                    SessionEnd::Failed(reason) => {
                        warn!(game_id = %spec.game_id, %reason, "session failed")
                    }
                    _ => info!(game_id = %spec.game_id, "session finished"),
                }
                close_all(&players, writers).await;
                return Ok(end);
            }
            handoff = handoffs.next() => match handoff {
                Some(handoff) => writers.extend(accept(&by_id, handoff)),
                None => {
                    info!(game_id = %spec.game_id, "handoff source closed");
                    return Ok(SessionEnd::Abandoned);
                }
            },
        }
    }
}

fn accept(
    players: &HashMap<PlayerId, Arc<PlayerConnection>>,
    handoff: Handoff,
) -> Option<JoinHandle<()>> {
    let Handoff { player_id, stream } = handoff;

    let Some(conn) = players.get(&player_id) else {
        warn!(player = %player_id, "socket for a player outside this game dropped");
        return None;
    };

    debug!(player = %player_id, "socket handed off");
    match transport::attach_std(conn.clone(), stream) {
        Ok(writer) => Some(writer),
        Err(e) => {
            warn!(player = %player_id, error = %e, "could not adopt handed-off socket");
            None
        }
    }
}

/// Close every player socket once its queued frames are written.
async fn close_all(players: &[Arc<PlayerConnection>], writers: Vec<JoinHandle<()>>) {
    for conn in players {
        conn.close();
    }

    let flushed = tokio::time::timeout(FLUSH_TIMEOUT, async {
        for writer in writers {
            let _ = writer.await;
        }
    })
    .await;

    if flushed.is_err() {
        warn!("players still had unsent frames when the session closed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use loon_core::EngineError;
    use tokio::sync::mpsc;

    use super::*;

    /// Engine that records what its single seat picked.
    struct PickOnce {
        picked: Arc<Mutex<Option<String>>>,
    }

    impl GameEngine for PickOnce {
        fn run(&mut self, io: &dyn GameInterface) -> Result<(), EngineError> {
            let choice = io.select_option(
                Seat(0),
                vec![GameOption::text("north"), GameOption::text("south")],
                false,
                Vec::new(),
                None,
            );
            if let Some(loon_core::Choice::Picked(option)) = choice {
                *self.picked.lock().unwrap() = Some(loon_core::Selectable::label(&option));
            }
            Ok(())
        }
    }

    struct Panics;

    impl GameEngine for Panics {
        fn run(&mut self, _io: &dyn GameInterface) -> Result<(), EngineError> {
            panic!("rules bug");
        }
    }

    fn spec(players: &[&str]) -> SessionSpec {
        SessionSpec {
            game_id: "g".into(),
            player_ids: players.iter().map(|p| p.to_string()).collect(),
            setup: SetupInfo {
                num_players: players.len(),
            },
        }
    }

    #[tokio::test]
    async fn engine_error_fails_the_session() {
        let (_tx, rx) = mpsc::unbounded_channel();
        let engine = draft_engine()(&SetupInfo { num_players: 0 });

        let end = run_session(spec(&[]), engine, HandoffSource::Channel(rx)).await.unwrap();

        assert!(matches!(end, SessionEnd::Failed(_)));
    }

    #[tokio::test]
    async fn engine_panic_is_contained() {
        let (_tx, rx) = mpsc::unbounded_channel();

        let end = run_session(spec(&["p0"]), Box::new(Panics), HandoffSource::Channel(rx))
            .await
            .unwrap();

        assert_eq!(end, SessionEnd::Failed("engine panicked".to_string()));
    }

    #[tokio::test]
    async fn closed_handoff_source_abandons_the_session() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(tx);
        let picked = Arc::new(Mutex::new(None));

        let end = run_session(
            spec(&["p0"]),
            Box::new(PickOnce { picked: picked.clone() }),
            HandoffSource::Channel(rx),
        )
        .await
        .unwrap();

        assert_eq!(end, SessionEnd::Abandoned);
        assert!(picked.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn handed_off_socket_answers_the_engine() {
        use loon_protocol::async_frame::{read_frame, write_frame};
        use loon_protocol::{ClientMessage, ServerMessage};

        let (tx, rx) = mpsc::unbounded_channel();
        let picked = Arc::new(Mutex::new(None));
        let session = tokio::spawn(run_session(
            spec(&["p0"]),
            Box::new(PickOnce { picked: picked.clone() }),
            HandoffSource::Channel(rx),
        ));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut client = tokio::net::TcpStream::connect(listener.local_addr().unwrap())
            .await
            .unwrap();
        let (server_side, _) = listener.accept().await.unwrap();
        tx.send(Handoff {
            player_id: "p0".into(),
            stream: server_side.into_std().unwrap(),
        })
        .unwrap();

        let frame = read_frame(&mut client).await.unwrap().unwrap();
        let message: ServerMessage = serde_json::from_value(frame).unwrap();
        assert!(matches!(
            message,
            ServerMessage::Select { ref options, .. } if options == &["north", "south"]
        ));

        write_frame(&mut client, &ClientMessage::response("SO")).await.unwrap();

        assert_eq!(session.await.unwrap().unwrap(), SessionEnd::Finished);
        assert_eq!(picked.lock().unwrap().as_deref(), Some("south"));
    }
}
