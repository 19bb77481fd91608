//! Process-per-game isolation.
//!
//! Manager side:
//! - bind a one-shot unix listener under the runtime dir,
//! - launch `<exe> session --control <path>`,
//! - wait for the child to connect, then send it its `SessionSpec`,
//! - forward every handed-off socket to it by descriptor passing.
//!
//! Child side: [`run_session_process`] connects back, reads the spec and
//! runs the session with sockets arriving over the same channel.
//!
//! A crash in a child only closes its control socket; the manager notices
//! when the child is reaped and drops the game.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::net::{UnixListener, UnixStream};
use tokio::process::{Child, Command};
use tracing::{debug, info_span, Instrument};

use crate::error::ServerError;
use crate::handoff::{FdReceiver, FdSender};
use crate::session::{run_session, HandoffSource, SessionEnd, SessionSpec};
use crate::types::{EngineFactory, GameId, HandoffRx};

/// How long a freshly launched session process has to connect back.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

static NEXT_CONTROL_SOCKET: AtomicU64 = AtomicU64::new(1);

fn control_socket_path(runtime_dir: &Path) -> PathBuf {
    let n = NEXT_CONTROL_SOCKET.fetch_add(1, Ordering::Relaxed);
    runtime_dir.join(format!("loon-{}-{}.sock", std::process::id(), n))
}

/// A launched session process and the manager's end of its control socket.
#[derive(Debug)]
pub struct SessionProcess {
    pub child: Child,
    pub sender: FdSender,
}

pub async fn spawn_session_process(
    exe: &Path,
    runtime_dir: &Path,
    spec: &SessionSpec,
) -> Result<SessionProcess, ServerError> {
    let path = control_socket_path(runtime_dir);
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path).map_err(ServerError::Spawn)?;

    let spawned = Command::new(exe)
        .arg("session")
        .arg("--control")
        .arg(&path)
        .stdin(Stdio::null())
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => {
            let _ = std::fs::remove_file(&path);
            return Err(ServerError::Spawn(e));
        }
    };

    let accepted = tokio::time::timeout(CONNECT_TIMEOUT, listener.accept()).await;
    let _ = std::fs::remove_file(&path);

    let control = match accepted {
        Ok(Ok((stream, _))) => stream,
        Ok(Err(e)) => {
            let _ = child.start_kill();
            return Err(ServerError::Spawn(e));
        }
        Err(_) => {
            let _ = child.start_kill();
            return Err(ServerError::Spawn(io::Error::new(
                io::ErrorKind::TimedOut,
                "session process never connected",
            )));
        }
    };

    let sender = FdSender::new(control);
    if let Err(e) = sender.send_spec(spec).await {
        let _ = child.start_kill();
        return Err(ServerError::Spawn(e));
    }

    debug!(game_id = %spec.game_id, pid = ?child.id(), "session process connected");
    Ok(SessionProcess { child, sender })
}

/// Drain `rx` into the session process until either side goes away.
pub async fn forward_handoffs(
    sender: FdSender,
    mut rx: HandoffRx,
    game_id: GameId,
) -> Result<(), ServerError> {
    while let Some(handoff) = rx.recv().await {
        let player_id = handoff.player_id.clone();
        sender.send(handoff).await.map_err(ServerError::Handoff)?;
        debug!(game_id = %game_id, player = %player_id, "socket passed to session process");
    }
    Ok(())
}

/// Entry point of a session process.
pub async fn run_session_process(
    control: &Path,
    engines: EngineFactory,
) -> Result<SessionEnd, ServerError> {
    let stream = UnixStream::connect(control)
        .await
        .map_err(ServerError::Handoff)?;
    let mut receiver = FdReceiver::new(stream);

    let spec = receiver
        .recv_spec()
        .await
        .map_err(ServerError::Handoff)?
        .ok_or_else(|| {
            ServerError::Handoff(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "manager hung up before sending the session spec",
            ))
        })?;

    let span = info_span!("session", game_id = %spec.game_id, pid = std::process::id());
    let engine = engines(&spec.setup);

    let end = run_session(spec, engine, HandoffSource::Control(receiver))
        .instrument(span)
        .await?;
    Ok(end)
}
