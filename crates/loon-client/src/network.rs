// crates/loon-client/src/network.rs

use anyhow::{anyhow, bail, Context, Result};
use loon_protocol::async_frame::{read_frame, write_frame};
use loon_protocol::{
    AdminRequest, AdminResponse, ClientMessage, ConnectionResult, FrameDecoder, ServerMessage,
};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info};

/// What arrived from the server.
#[derive(Debug)]
pub enum Incoming {
    Message(ServerMessage),
    /// A well-formed frame this client does not know.
    Other(Value),
}

/// An authenticated player connection.
///
/// The decoder lives here rather than per read, so `recv` can be dropped
/// mid-frame (it sits in a `select!` against stdin) without losing bytes.
pub struct GameConnection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    decoder: FrameDecoder,
}

impl GameConnection {
    /// Connect and run the handshake for `player_id`.
    pub async fn join(server_addr: &str, player_id: &str) -> Result<Self> {
        info!("Connecting to {}...", server_addr);
        let stream = TcpStream::connect(server_addr)
            .await
            .with_context(|| format!("connecting to {server_addr}"))?;
        stream.set_nodelay(true)?;

        let (read_half, writer) = stream.into_split();
        let mut connection = GameConnection {
            reader: BufReader::new(read_half),
            writer,
            decoder: FrameDecoder::new(),
        };

        write_frame(&mut connection.writer, &ClientMessage::connect(player_id)).await?;

        let reply = connection
            .next_frame()
            .await?
            .ok_or_else(|| anyhow!("server closed the connection during the handshake"))?;

        match serde_json::from_value::<ServerMessage>(reply) {
            Ok(ServerMessage::Connection {
                result: ConnectionResult::Success,
                ..
            }) => {
                info!("Connected as {}", player_id);
                Ok(connection)
            }
            Ok(ServerMessage::Connection { reason, .. }) => {
                let reason = reason.unwrap_or_else(|| "no reason given".into());
                bail!("connection refused: {reason}")
            }
            Ok(other) => bail!("unexpected handshake reply: {other:?}"),
            Err(e) => bail!("malformed handshake reply: {e}"),
        }
    }

    /// Next frame, `None` once the server hung up. Cancel safe.
    pub async fn recv(&mut self) -> Result<Option<Incoming>> {
        let Some(frame) = self.next_frame().await? else {
            return Ok(None);
        };

        Ok(Some(match serde_json::from_value::<ServerMessage>(frame.clone()) {
            Ok(message) => Incoming::Message(message),
            Err(_) => Incoming::Other(frame),
        }))
    }

    /// The only await is `fill_buf`, which is cancel safe; bytes are
    /// consumed only once they are inside the decoder.
    async fn next_frame(&mut self) -> Result<Option<Value>> {
        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Ok(None);
            }

            let mut used = 0;
            let mut frame = None;
            for &byte in buf {
                used += 1;
                if let Some(value) = self.decoder.push_byte(byte) {
                    frame = Some(value);
                    break;
                }
            }
            self.reader.consume(used);

            if frame.is_some() {
                return Ok(frame);
            }
        }
    }

    pub async fn answer(&mut self, text: &str) -> Result<()> {
        debug!("Answering {:?}", text);
        write_frame(&mut self.writer, &ClientMessage::response(text)).await?;
        Ok(())
    }
}

/// Ask the admin endpoint for a new game. Returns its player ids.
pub async fn create_game(admin_addr: &str, game_id: &str, players: usize) -> Result<Vec<String>> {
    let stream = TcpStream::connect(admin_addr)
        .await
        .with_context(|| format!("connecting to admin endpoint {admin_addr}"))?;
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let request = AdminRequest::CreateGame {
        game_id: game_id.to_string(),
        players,
    };
    write_frame(&mut writer, &request).await?;

    let reply = read_frame(&mut reader)
        .await?
        .ok_or_else(|| anyhow!("admin endpoint closed without replying"))?;
    let reply: AdminResponse = serde_json::from_value(reply).context("malformed admin reply")?;

    reply
        .player_ids()
        .ok_or_else(|| anyhow!("server refused to create game {game_id:?}"))
}
