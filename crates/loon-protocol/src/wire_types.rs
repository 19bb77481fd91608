//! Low-level wire constants shared by server and clients.
//!
//! Every frame is one JSON object on one line, discriminated by its
//! `"type"` field. The typed messages live in `message`; this module only
//! holds the fixed strings and small enums they are built from.

use serde::{Deserialize, Serialize};

/// Frame terminator.
pub const FRAME_DELIMITER: u8 = b'\n';

/// Longest line the decoder buffers. Anything longer is dropped up to the
/// next newline, like any other malformed frame.
pub const MAX_FRAME_LEN: usize = 1 << 20;

/// Failure reason: the first frame was not a well-formed connect request.
pub const REASON_INVALID_CONNECTION: &str = "invalid connection";

/// Failure reason: the connect request named an unknown player id.
pub const REASON_INVALID_ID: &str = "invalid id";

/// Outcome carried by a `connection` frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionResult {
    Success,
    Failed,
}
