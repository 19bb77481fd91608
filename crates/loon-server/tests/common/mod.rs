// crates/loon-server/tests/common/mod.rs
#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use loon_protocol::async_frame::{read_frame, write_frame};
use loon_server::{Config, Isolation, Server};
use serde_json::{json, Value};
use tokio::io::BufReader;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

const WAIT: Duration = Duration::from_secs(10);

pub struct Running {
    pub players: SocketAddr,
    pub admin: SocketAddr,
}

pub fn test_config(isolation: Isolation) -> Config {
    Config {
        bind_addr: "127.0.0.1".to_string(),
        port: 0,
        admin_port: 0,
        handshake_timeout: Duration::from_secs(5),
        isolation,
        ..Config::default()
    }
}

pub async fn start(config: Config) -> Running {
    let server = Server::bind(config).await.unwrap();
    let running = Running {
        players: server.local_addr().unwrap(),
        admin: server.admin_addr().unwrap(),
    };
    tokio::spawn(server.serve());
    running
}

/// One line-delimited JSON connection.
pub struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    pub async fn connect(addr: SocketAddr) -> Client {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, writer) = stream.into_split();
        Client {
            reader: BufReader::new(read_half),
            writer,
        }
    }

    pub async fn send(&mut self, value: Value) {
        write_frame(&mut self.writer, &value).await.unwrap();
    }

    /// Next frame, `None` once the server closed the connection.
    pub async fn recv(&mut self) -> Option<Value> {
        tokio::time::timeout(WAIT, read_frame(&mut self.reader))
            .await
            .expect("timed out waiting for a frame")
            .unwrap()
    }

    pub async fn expect(&mut self) -> Value {
        self.recv().await.expect("connection closed")
    }

    /// Connect as `player_id` and check the handshake succeeded.
    pub async fn join(addr: SocketAddr, player_id: &str) -> Client {
        let mut client = Client::connect(addr).await;
        client.send(json!({"type": "connect", "id": player_id})).await;
        assert_eq!(
            client.expect().await,
            json!({"type": "connection", "result": "success"})
        );
        client
    }

    pub async fn answer(&mut self, text: &str) {
        self.send(json!({"type": "option_response", "selected": text}))
            .await;
    }
}

/// Create a game through the admin endpoint. `None` when refused.
pub async fn create_game(admin: SocketAddr, game_id: &str, players: usize) -> Option<Vec<String>> {
    let mut client = Client::connect(admin).await;
    client
        .send(json!({"type": "create_game", "game_id": game_id, "players": players}))
        .await;

    let reply = client.expect().await;
    assert_eq!(reply["type"], "create_game");
    reply["ids"]
        .as_str()
        .map(|ids| ids.split(',').map(str::to_string).collect())
}
