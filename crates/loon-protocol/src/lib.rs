//! loon-protocol
//!
//! Wire-level encoding/decoding for the game server.
//!
//! This crate turns the logical messages of `loon_core` (select requests,
//! rendered events) into newline-delimited JSON frames and back.
//!
//! - [`frame`]       : blocking frame codec and the incremental decoder
//! - [`message`]     : typed client, server and admin frames
//! - [`wire_types`]  : reasons, limits and other fixed strings
//! - `async_frame`   : the codec over tokio streams (feature `tokio`)

pub mod wire_types;
pub mod frame;
pub mod message;

#[cfg(feature = "tokio")]
pub mod async_frame;

pub use frame::{encode_frame, read_frame, write_frame, FrameDecoder};
pub use message::{AdminRequest, AdminResponse, ClientMessage, ServerMessage};
pub use wire_types::ConnectionResult;
