//! Configuration for the game server.
//!
//! Defaults can be overridden via environment variables (and, in the
//! binary, by command-line flags on top of those):
//!
//! - `LOON_BIND_ADDR`            (default: "0.0.0.0")
//! - `LOON_PORT`                 (default: "9999")
//! - `LOON_ADMIN_PORT`           (default: "8080")
//! - `LOON_MAX_SESSIONS`         (default: "256")
//! - `LOON_MAX_PLAYERS`          (default: "64")
//! - `LOON_HANDSHAKE_TIMEOUT_MS` (default: "30000")
//! - `LOON_ISOLATION`            (default: "process" on unix, "thread" elsewhere)
//! - `LOON_RUNTIME_DIR`          (default: system temp dir)
//! - `LOON_SESSION_EXE`          (default: the running executable)

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::error::ServerError;

/// Where a game session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Isolation {
    /// One OS process per game; sockets move in by descriptor passing.
    Process,

    /// A task plus an engine thread inside the server process.
    Thread,
}

impl Default for Isolation {
    fn default() -> Self {
        if cfg!(unix) {
            Isolation::Process
        } else {
            Isolation::Thread
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown isolation mode {0:?} (expected \"process\" or \"thread\")")]
pub struct ParseIsolationError(String);

impl FromStr for Isolation {
    type Err = ParseIsolationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "process" => Ok(Isolation::Process),
            "thread" => Ok(Isolation::Thread),
            _ => Err(ParseIsolationError(s.to_string())),
        }
    }
}

impl fmt::Display for Isolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Isolation::Process => f.write_str("process"),
            Isolation::Thread => f.write_str("thread"),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Interface both listeners bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// Player connection port. 0 picks a free port.
    pub port: u16,

    /// Create-game endpoint port. 0 picks a free port.
    pub admin_port: u16,

    /// Maximum number of simultaneously registered games.
    pub max_sessions: usize,

    /// Most seats a single game may have.
    pub max_players: usize,

    /// How long a fresh connection has to send its connect frame.
    pub handshake_timeout: Duration,

    pub isolation: Isolation,

    /// Directory for per-session control sockets.
    pub runtime_dir: PathBuf,

    /// Executable launched for process isolation; `None` means this one.
    pub session_exe: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "0.0.0.0".to_string(),
            port: 9999,
            admin_port: 8080,
            max_sessions: 256,
            max_players: 64,
            handshake_timeout: Duration::from_millis(30_000),
            isolation: Isolation::default(),
            runtime_dir: env::temp_dir(),
            session_exe: None,
        }
    }
}

impl Config {
    /// Construct a `Config` from environment variables, falling back
    /// to the defaults.
    pub fn from_env() -> Result<Self, ServerError> {
        let defaults = Config::default();

        let bind_addr = env::var("LOON_BIND_ADDR").unwrap_or(defaults.bind_addr);
        let port = read_env_or_default("LOON_PORT", defaults.port)?;
        let admin_port = read_env_or_default("LOON_ADMIN_PORT", defaults.admin_port)?;
        let max_sessions = read_env_or_default("LOON_MAX_SESSIONS", defaults.max_sessions)?;
        let max_players = read_env_or_default("LOON_MAX_PLAYERS", defaults.max_players)?;
        let handshake_ms = read_env_or_default(
            "LOON_HANDSHAKE_TIMEOUT_MS",
            defaults.handshake_timeout.as_millis() as u64,
        )?;
        let isolation = read_env_or_default("LOON_ISOLATION", defaults.isolation)?;
        let runtime_dir = env::var_os("LOON_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.runtime_dir);
        let session_exe = env::var_os("LOON_SESSION_EXE").map(PathBuf::from);

        Ok(Config {
            bind_addr,
            port,
            admin_port,
            max_sessions,
            max_players,
            handshake_timeout: Duration::from_millis(handshake_ms),
            isolation,
            runtime_dir,
            session_exe,
        })
    }

    /// Convenience: `addr:port` of the player listener.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// Convenience: `addr:port` of the admin listener.
    pub fn admin_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.admin_port)
    }
}

fn read_env_or_default<T>(key: &str, default: T) -> Result<T, ServerError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ServerError::Config(format!("{key}={val:?}: {e}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isolation_parses_loosely() {
        assert_eq!("process".parse::<Isolation>().unwrap(), Isolation::Process);
        assert_eq!(" Thread ".parse::<Isolation>().unwrap(), Isolation::Thread);
        assert!("fork".parse::<Isolation>().is_err());
    }

    #[test]
    fn defaults_match_documented_ports() {
        let config = Config::default();

        assert_eq!(config.socket_addr_string(), "0.0.0.0:9999");
        assert_eq!(config.admin_addr_string(), "0.0.0.0:8080");
        assert_eq!(config.handshake_timeout, Duration::from_secs(30));
        assert_eq!(config.max_players, 64);
    }

    #[test]
    fn bad_env_value_names_the_variable() {
        let port = read_env_or_default::<u16>("LOON_TEST_UNSET_PORT_VAR", 1).unwrap();
        assert_eq!(port, 1);

        env::set_var("LOON_TEST_BAD_PORT_VAR", "nine");
        let err = read_env_or_default::<u16>("LOON_TEST_BAD_PORT_VAR", 1).unwrap_err();
        assert!(err.to_string().contains("LOON_TEST_BAD_PORT_VAR"));
    }
}
