//! Game server binary.
//!
//! `loon-server [serve]` runs the listeners. `loon-server session` is what
//! the server launches for every game under process isolation.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use loon_server::config::{Config, Isolation};
use loon_server::server;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "loon-server", version, about = "Multiplayer turn-based game server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the player and admin listeners (default).
    Serve(ServeArgs),

    /// Run one game session, fed by the server over a control socket.
    #[command(hide = true)]
    Session(SessionArgs),
}

/// Flags override the `LOON_*` environment.
#[derive(Debug, Default, Args)]
struct ServeArgs {
    #[arg(long)]
    bind: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    admin_port: Option<u16>,

    #[arg(long)]
    max_sessions: Option<usize>,

    /// Seat limit per game.
    #[arg(long)]
    max_players: Option<usize>,

    /// `process` or `thread`.
    #[arg(long)]
    isolation: Option<Isolation>,

    #[arg(long)]
    runtime_dir: Option<PathBuf>,
}

impl ServeArgs {
    fn apply(self, config: &mut Config) {
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(admin_port) = self.admin_port {
            config.admin_port = admin_port;
        }
        if let Some(max_sessions) = self.max_sessions {
            config.max_sessions = max_sessions;
        }
        if let Some(max_players) = self.max_players {
            config.max_players = max_players;
        }
        if let Some(isolation) = self.isolation {
            config.isolation = isolation;
        }
        if let Some(runtime_dir) = self.runtime_dir {
            config.runtime_dir = runtime_dir;
        }
    }
}

#[derive(Debug, Args)]
struct SessionArgs {
    /// Unix socket the server is listening on for this session.
    #[arg(long)]
    control: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve(ServeArgs::default())) {
        Command::Serve(args) => {
            let mut config = Config::from_env().context("reading LOON_* configuration")?;
            args.apply(&mut config);

            info!(
                players = %config.socket_addr_string(),
                admin = %config.admin_addr_string(),
                max_sessions = config.max_sessions,
                isolation = %config.isolation,
                "starting loon-server"
            );

            server::run(config).await.context("server stopped")?;
        }
        Command::Session(args) => run_session(args).await?,
    }

    Ok(())
}

#[cfg(unix)]
async fn run_session(args: SessionArgs) -> anyhow::Result<()> {
    use loon_server::isolation::run_session_process;
    use loon_server::session::draft_engine;

    let end = run_session_process(&args.control, draft_engine())
        .await
        .with_context(|| format!("session on {}", args.control.display()))?;
    info!(?end, "session process exiting");
    Ok(())
}

#[cfg(not(unix))]
async fn run_session(_args: SessionArgs) -> anyhow::Result<()> {
    anyhow::bail!("process isolation is only available on unix")
}
