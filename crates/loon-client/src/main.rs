// crates/loon-client/src/main.rs

mod display;
mod network;

use std::io::Write;

use anyhow::Result;
use clap::Parser;
use loon_protocol::ServerMessage;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::network::{GameConnection, Incoming};

#[derive(Parser)]
#[clap(name = "loon-client")]
#[clap(about = "Console client for the loon game server")]
struct Cli {
    /// Player listener address
    #[clap(short, long, default_value = "127.0.0.1:9999")]
    server: String,

    /// Admin endpoint address
    #[clap(short, long, default_value = "127.0.0.1:8080")]
    admin: String,

    /// Player id to connect with
    #[clap(short, long)]
    id: Option<String>,

    /// Create this game first and join as its first player
    #[clap(short, long)]
    create: Option<String>,

    /// Seats of the created game
    #[clap(short, long, default_value_t = 1)]
    players: usize,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut player_id = cli.id.clone();

    if let Some(game_id) = &cli.create {
        let ids = network::create_game(&cli.admin, game_id, cli.players).await?;
        println!("Created game {game_id}. Player ids:");
        for (seat, id) in ids.iter().enumerate() {
            println!("  seat {seat}: {id}");
        }
        if player_id.is_none() {
            player_id = ids.into_iter().next();
        }
    }

    let Some(player_id) = player_id else {
        anyhow::bail!("nothing to join: pass --id, or --create a game");
    };

    let connection = GameConnection::join(&cli.server, &player_id).await?;
    println!("Connected.");

    run(connection).await
}

async fn run(mut connection: GameConnection) -> Result<()> {
    // Stdin lines, read on their own task so frames keep printing while the
    // player thinks.
    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            incoming = connection.recv() => match incoming? {
                Some(Incoming::Message(message)) => show(message),
                Some(Incoming::Other(frame)) => println!("{frame}"),
                None => {
                    println!("Server closed the connection.");
                    break;
                }
            },
            line = line_rx.recv() => match line {
                Some(line) => connection.answer(line.trim()).await?,
                None => {
                    info!("stdin closed");
                    break;
                }
            },
        }
    }

    Ok(())
}

fn show(message: ServerMessage) {
    match message {
        ServerMessage::Select {
            options,
            additional_options,
            reason,
        } => {
            print!("{}", display::select(&options, &additional_options, reason.as_deref()));
            let _ = std::io::stdout().flush();
        }
        ServerMessage::Event {
            event_type,
            first,
            values,
        } => println!("{}", display::event(&event_type, first, &values)),
        ServerMessage::Connection { .. } => {
            warn!("unexpected connection frame after the handshake");
        }
    }
}
