//! TCP listeners and top-level server wiring.
//!
//! This module:
//! - listens for players on the configured port and runs the connect
//!   handshake on every new socket,
//! - hands authenticated sockets to the `GameManager`,
//! - serves the create-game endpoint on the admin port.
//!
//! Handshake: the first well-formed frame must be
//! `{"type":"connect","id":..}` and arrive within the handshake timeout.
//! The server answers `success` and passes the socket on, or answers
//! `failed` with a reason and closes it.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use loon_core::SetupInfo;
use loon_protocol::async_frame::{read_frame, write_frame};
use loon_protocol::{AdminRequest, AdminResponse, ClientMessage, ServerMessage};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::ServerError;
use crate::manager::GameManager;
use crate::session::draft_engine;

pub struct Server {
    players: TcpListener,
    admin: TcpListener,
    manager: GameManager,
    handshake_timeout: Duration,
}

impl Server {
    /// Bind both listeners. Sessions run the bundled card draft.
    pub async fn bind(config: Config) -> Result<Self, ServerError> {
        let players = TcpListener::bind(config.socket_addr_string()).await?;
        let admin = TcpListener::bind(config.admin_addr_string()).await?;

        Ok(Server {
            players,
            admin,
            manager: GameManager::new(&config, draft_engine()),
            handshake_timeout: config.handshake_timeout,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.players.local_addr()
    }

    pub fn admin_addr(&self) -> io::Result<SocketAddr> {
        self.admin.local_addr()
    }

    pub fn manager(&self) -> &GameManager {
        &self.manager
    }

    /// Accept players and admin requests until the player listener fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        info!(players = %self.local_addr()?, admin = %self.admin_addr()?, "listening");

        tokio::spawn(run_admin(self.admin, self.manager.clone()));

        loop {
            let (stream, peer_addr) = match self.players.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            };

            debug!(%peer_addr, "player connection accepted");
            let manager = self.manager.clone();
            let timeout = self.handshake_timeout;
            tokio::spawn(async move {
                handshake(stream, peer_addr, manager, timeout).await;
            });
        }
    }
}

/// Run the server with the given configuration.
pub async fn run(config: Config) -> Result<(), ServerError> {
    Server::bind(config).await?.serve().await
}

async fn handshake(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    manager: GameManager,
    timeout: Duration,
) {
    // Unbuffered on purpose: nothing past the connect frame may be read
    // here, the rest belongs to the session.
    let first = tokio::time::timeout(timeout, read_frame(&mut stream)).await;

    let player_id = match first {
        Ok(Ok(Some(frame))) => match ClientMessage::from_value(frame) {
            Some(ClientMessage::Connect { id }) => id,
            _ => {
                debug!(%peer_addr, "first frame is not a connect request");
                reject(stream, ServerMessage::invalid_connection()).await;
                return;
            }
        },
        Ok(Ok(None)) => {
            debug!(%peer_addr, "closed before connecting");
            return;
        }
        Ok(Err(e)) => {
            debug!(%peer_addr, error = %e, "handshake read failed");
            return;
        }
        Err(_) => {
            debug!(%peer_addr, "handshake timed out");
            reject(stream, ServerMessage::invalid_connection()).await;
            return;
        }
    };

    if !manager.player_id_registered(&player_id) {
        info!(%peer_addr, "connect with an unknown player id");
        reject(stream, ServerMessage::invalid_id()).await;
        return;
    }

    if let Err(e) = write_frame(&mut stream, &ServerMessage::connection_success()).await {
        debug!(%peer_addr, error = %e, "could not confirm connection");
        return;
    }

    let stream = match stream.into_std() {
        Ok(stream) => stream,
        Err(e) => {
            warn!(%peer_addr, error = %e, "could not detach socket from the runtime");
            return;
        }
    };

    if manager.new_connection(stream, &player_id) {
        info!(%peer_addr, player = %player_id, "player connected");
    } else {
        // The game ended between the id check and the handoff.
        info!(%peer_addr, player = %player_id, "game gone during handshake, socket closed");
    }
}

async fn reject(mut stream: TcpStream, reply: ServerMessage) {
    let _ = write_frame(&mut stream, &reply).await;
    let _ = stream.shutdown().await;
}

async fn run_admin(listener: TcpListener, manager: GameManager) {
    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "admin accept failed");
                continue;
            }
        };

        let manager = manager.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_admin(stream, manager).await {
                debug!(%peer_addr, error = %e, "admin connection ended");
            }
        });
    }
}

async fn serve_admin(stream: TcpStream, manager: GameManager) -> io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    while let Some(frame) = read_frame(&mut reader).await? {
        let reply = match serde_json::from_value::<AdminRequest>(frame) {
            Ok(AdminRequest::CreateGame { game_id, players }) => {
                match manager
                    .create_game(&game_id, SetupInfo { num_players: players })
                    .await
                {
                    Ok(ids) => AdminResponse::created(&ids),
                    Err(e) => {
                        warn!(game_id = %game_id, error = %e, "create_game failed");
                        AdminResponse::failed()
                    }
                }
            }
            Err(e) => {
                debug!(error = %e, "unrecognised admin request");
                AdminResponse::failed()
            }
        };

        write_frame(&mut write_half, &reply).await?;
    }

    Ok(())
}
