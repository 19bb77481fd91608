//! loon-server
//!
//! Network and session layer of the game server.
//!
//! - [`manager`]    : game registry, player ids, connection routing
//! - [`session`]    : one running game (engine thread + socket acceptor)
//! - [`connection`] : per-player select/notify state with replay
//! - [`server`]     : player and admin listeners

pub mod config;
pub mod error;
pub mod types;
pub mod permit;
pub mod connection;
pub mod ids;
pub mod session;
pub mod manager;
pub mod server;

#[cfg(unix)]
pub mod handoff;
#[cfg(unix)]
pub mod isolation;

// internal: socket I/O tasks behind `PlayerConnection`
mod transport;

pub use config::{Config, Isolation};
pub use error::ServerError;
pub use manager::GameManager;
pub use server::Server;
