//! Game registry and connection routing.
//!
//! The manager:
//! - issues player ids and registers each game under its id,
//! - starts the game's session in its isolation unit,
//! - routes authenticated sockets to the owning session,
//! - forgets a game, and all its player ids, once its session ends.
//!
//! Every player id in the index belongs to a registered game. A game is
//! registered before its session starts, so a concurrent create with the
//! same id fails as a duplicate, and removed again if the start fails.

use std::collections::HashMap;
use std::net::TcpStream;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use loon_core::SetupInfo;
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::{Config, Isolation};
use crate::error::ServerError;
use crate::ids::IdGenerator;
use crate::session::{run_session, HandoffSource, SessionSpec};
use crate::types::{EngineFactory, GameId, Handoff, HandoffRx, HandoffTx, PlayerId};

#[derive(Debug)]
struct SessionEntry {
    handoff: HandoffTx,
    player_ids: Vec<PlayerId>,
}

#[derive(Debug, Default)]
struct Registry {
    sessions: HashMap<GameId, SessionEntry>,
    player_index: HashMap<PlayerId, GameId>,
    ids: IdGenerator,
}

#[derive(Debug)]
struct Settings {
    max_sessions: usize,
    max_players: usize,
    isolation: Isolation,
    runtime_dir: PathBuf,
    session_exe: Option<PathBuf>,
}

#[derive(Clone)]
pub struct GameManager {
    registry: Arc<Mutex<Registry>>,
    settings: Arc<Settings>,
    engines: EngineFactory,
}

impl GameManager {
    pub fn new(config: &Config, engines: EngineFactory) -> Self {
        GameManager {
            registry: Arc::new(Mutex::new(Registry::default())),
            settings: Arc::new(Settings {
                max_sessions: config.max_sessions,
                max_players: config.max_players,
                isolation: config.isolation,
                runtime_dir: config.runtime_dir.clone(),
                session_exe: config.session_exe.clone(),
            }),
            engines,
        }
    }

    /// Register `game_id`, issue one player id per seat and start the
    /// session. Returns the ids in seat order.
    pub async fn create_game(
        &self,
        game_id: &str,
        setup: SetupInfo,
    ) -> Result<Vec<PlayerId>, ServerError> {
        if setup.num_players == 0 {
            return Err(ServerError::NoPlayers);
        }
        if setup.num_players > self.settings.max_players {
            return Err(ServerError::TooManyPlayers {
                requested: setup.num_players,
                max: self.settings.max_players,
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let player_ids = self.register(game_id, setup.num_players, tx)?;

        let spec = SessionSpec {
            game_id: game_id.to_string(),
            player_ids: player_ids.clone(),
            setup,
        };

        if let Err(e) = self.launch(spec, rx).await {
            self.session_ended(game_id);
            return Err(e);
        }

        info!(
            game_id,
            players = setup.num_players,
            isolation = %self.settings.isolation,
            "game created"
        );
        Ok(player_ids)
    }

    /// Route an authenticated socket to its session. `false` if the id is
    /// unknown or the session is gone; the socket is closed in that case.
    pub fn new_connection(&self, stream: TcpStream, player_id: &str) -> bool {
        let registry = self.lock();

        let Some(entry) = registry
            .player_index
            .get(player_id)
            .and_then(|game_id| registry.sessions.get(game_id))
        else {
            debug!(player = %player_id, "connection for an unknown player id");
            return false;
        };

        let handoff = Handoff {
            player_id: player_id.to_string(),
            stream,
        };
        entry.handoff.send(handoff).is_ok()
    }

    pub fn id_in_use(&self, game_id: &str) -> bool {
        self.lock().sessions.contains_key(game_id)
    }

    pub fn player_id_registered(&self, player_id: &str) -> bool {
        self.lock().player_index.contains_key(player_id)
    }

    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    fn register(
        &self,
        game_id: &str,
        seats: usize,
        handoff: HandoffTx,
    ) -> Result<Vec<PlayerId>, ServerError> {
        let mut registry = self.lock();

        if registry.sessions.contains_key(game_id) {
            return Err(ServerError::DuplicateGame(game_id.to_string()));
        }
        if registry.sessions.len() >= self.settings.max_sessions {
            return Err(ServerError::CapacityReached(self.settings.max_sessions));
        }

        let mut player_ids: Vec<PlayerId> = Vec::with_capacity(seats);
        while player_ids.len() < seats {
            let id = registry.ids.next_id();
            if registry.player_index.contains_key(&id) || player_ids.contains(&id) {
                warn!("player id collision, drawing again");
                continue;
            }
            player_ids.push(id);
        }

        for id in &player_ids {
            registry.player_index.insert(id.clone(), game_id.to_string());
        }
        registry.sessions.insert(
            game_id.to_string(),
            SessionEntry {
                handoff,
                player_ids: player_ids.clone(),
            },
        );

        Ok(player_ids)
    }

    /// Drop a game and its player ids.
    fn session_ended(&self, game_id: &str) {
        let mut registry = self.lock();
        if let Some(entry) = registry.sessions.remove(game_id) {
            for id in &entry.player_ids {
                registry.player_index.remove(id);
            }
            debug!(game_id, "game deregistered");
        }
    }

    async fn launch(&self, spec: SessionSpec, rx: HandoffRx) -> Result<(), ServerError> {
        match self.settings.isolation {
            Isolation::Thread => {
                self.launch_in_process(spec, rx);
                Ok(())
            }
            Isolation::Process => self.launch_process(spec, rx).await,
        }
    }

    fn launch_in_process(&self, spec: SessionSpec, rx: HandoffRx) {
        let engine = (self.engines)(&spec.setup);
        let manager = self.clone();
        let game_id = spec.game_id.clone();
        let span = info_span!("session", game_id = %game_id);

        tokio::spawn(
            async move {
                match run_session(spec, engine, HandoffSource::Channel(rx)).await {
                    Ok(end) => debug!(?end, "session over"),
                    Err(e) => warn!(error = %e, "session could not start"),
                }
                manager.session_ended(&game_id);
            }
            .instrument(span),
        );
    }

    #[cfg(unix)]
    async fn launch_process(&self, spec: SessionSpec, rx: HandoffRx) -> Result<(), ServerError> {
        use crate::isolation::{forward_handoffs, spawn_session_process, SessionProcess};

        let exe = match &self.settings.session_exe {
            Some(exe) => exe.clone(),
            None => std::env::current_exe().map_err(ServerError::Spawn)?,
        };

        let SessionProcess { mut child, sender } =
            spawn_session_process(&exe, &self.settings.runtime_dir, &spec).await?;
        let game_id = spec.game_id;

        {
            let game_id = game_id.clone();
            tokio::spawn(async move {
                if let Err(e) = forward_handoffs(sender, rx, game_id.clone()).await {
                    warn!(game_id = %game_id, error = %e, "stopped forwarding sockets");
                }
            });
        }

        let manager = self.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => info!(game_id = %game_id, %status, "session process exited"),
                Err(e) => warn!(game_id = %game_id, error = %e, "lost track of session process"),
            }
            manager.session_ended(&game_id);
        });

        Ok(())
    }

    #[cfg(not(unix))]
    async fn launch_process(&self, _spec: SessionSpec, _rx: HandoffRx) -> Result<(), ServerError> {
        Err(ServerError::Config(
            "process isolation needs descriptor passing (unix only)".to_string(),
        ))
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
