//! Socket I/O tasks for an attached player.
//!
//! Each socket gets:
//! - a writer task draining the connection's outbound queue, one frame per
//!   `write_all`, so frames never interleave;
//! - a reader task feeding decoded frames back into the connection and
//!   reporting end of stream.
//!
//! Read and write errors end the socket, never the pending request.

use std::io;
use std::sync::Arc;

use loon_protocol::async_frame::{read_frame, write_frame};
use tokio::io::BufReader;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::connection::PlayerConnection;
use crate::types::OutboundRx;

/// Bind a socket that arrived through a handoff to `conn`.
pub fn attach_std(
    conn: Arc<PlayerConnection>,
    stream: std::net::TcpStream,
) -> io::Result<JoinHandle<()>> {
    stream.set_nonblocking(true)?;
    let stream = TcpStream::from_std(stream)?;
    Ok(attach(conn, stream))
}

/// Returns the writer task, which ends once the connection drops this
/// socket and everything queued for it is written.
pub fn attach(conn: Arc<PlayerConnection>, stream: TcpStream) -> JoinHandle<()> {
    let (read_half, write_half) = stream.into_split();
    let (tx, rx) = mpsc::unbounded_channel();

    let generation = conn.attach(tx);

    let writer = tokio::spawn(write_loop(conn.player_id().to_string(), write_half, rx));
    tokio::spawn(read_loop(conn, generation, read_half));
    writer
}

async fn write_loop(player_id: String, mut write_half: OwnedWriteHalf, mut rx: OutboundRx) {
    while let Some(message) = rx.recv().await {
        if let Err(e) = write_frame(&mut write_half, &message).await {
            debug!(player = %player_id, error = %e, "write failed");
            break;
        }
    }
}

async fn read_loop(conn: Arc<PlayerConnection>, generation: u64, read_half: OwnedReadHalf) {
    let mut reader = BufReader::new(read_half);

    loop {
        match read_frame(&mut reader).await {
            Ok(Some(frame)) => conn.deliver(generation, frame),
            Ok(None) => break,
            Err(e) => {
                debug!(player = %conn.player_id(), error = %e, "read failed");
                break;
            }
        }
    }

    conn.detach(generation);
}
