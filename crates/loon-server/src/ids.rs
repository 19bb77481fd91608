//! Player id generator.
//!
//! A rolling SHA3-256 state. Every draw folds the current time into the
//! state and hex-encodes the digest of everything folded so far, so two
//! draws differ even when the clock does not move between them. The ids
//! are meant to be unguessable handles, not secrets at rest.

use std::time::{SystemTime, UNIX_EPOCH};

use sha3::{Digest, Sha3_256};

#[derive(Debug, Clone)]
pub struct IdGenerator {
    state: Sha3_256,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    /// Seeded with the startup time.
    pub fn new() -> Self {
        let mut state = Sha3_256::new();
        state.update(timestamp().as_bytes());
        IdGenerator { state }
    }

    /// 64 lowercase hex characters.
    pub fn next_id(&mut self) -> String {
        self.state.update(timestamp().as_bytes());
        format!("{:x}", self.state.clone().finalize())
    }
}

fn timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => format!("{}.{:09}", d.as_secs(), d.subsec_nanos()),
        Err(_) => String::from("0"),
    }
}
