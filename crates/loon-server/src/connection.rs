//! Per-player connection state.
//!
//! A `PlayerConnection` outlives any single socket. It keeps:
//! - the seat it is bound to,
//! - the current transport (an outbound queue plus a generation number),
//! - every event sent so far, for replay on reconnect,
//! - the select request currently waiting for an answer.
//!
//! The engine thread blocks in [`PlayerConnection::select`] on a
//! [`Permit`]. Socket tasks open the permit: the reader after queueing a
//! received frame or on a disconnect, the very first `attach` with
//! `Attached`. Frames are queued rather than carried by the permit, so a
//! burst of frames is checked in arrival order and none is overwritten.
//!
//! Lock order is always `inner` then the permit's slot.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use loon_core::{EventRecord, PlayerIo, Seat, SelectRequest};
use loon_protocol::{ClientMessage, ServerMessage};
use serde_json::Value;
use tracing::{debug, info};

use crate::permit::Permit;
use crate::types::{OutboundTx, PlayerId};

/// What opened the permit.
#[derive(Debug)]
enum Delivery {
    /// The first socket ever attached.
    Attached,
    /// Frames were queued while a request was pending.
    Frames,
    /// The current socket closed while a request was pending.
    Disconnected,
}

#[derive(Debug)]
struct Outbound {
    tx: OutboundTx,
    generation: u64,
}

#[derive(Debug, Default)]
struct Inner {
    seat: Option<Seat>,
    socket: Option<Outbound>,
    generations: u64,
    ever_attached: bool,
    events: Vec<(EventRecord, bool)>,
    pending: Option<SelectRequest>,
    inbox: VecDeque<Value>,
    last_response: Option<String>,
}

impl Inner {
    fn send(&self, message: ServerMessage) {
        if let Some(socket) = &self.socket {
            // A closed writer is followed by a detach from the reader side.
            let _ = socket.tx.send(message);
        }
    }

    fn send_pending(&self) {
        if let Some(request) = &self.pending {
            self.send(ServerMessage::select(request));
        }
    }
}

#[derive(Debug)]
pub struct PlayerConnection {
    player_id: PlayerId,
    inner: Mutex<Inner>,
    permit: Permit<Delivery>,
}

impl PlayerConnection {
    pub fn new(player_id: impl Into<PlayerId>) -> Self {
        PlayerConnection {
            player_id: player_id.into(),
            inner: Mutex::new(Inner::default()),
            permit: Permit::new(),
        }
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    /// Associate the engine-side seat. Done once, before the engine runs.
    pub fn bind(&self, seat: Seat) {
        self.lock().seat = Some(seat);
    }

    pub fn seat(&self) -> Option<Seat> {
        self.lock().seat
    }

    pub fn is_attached(&self) -> bool {
        self.lock().socket.is_some()
    }

    /// Raw text of the last accepted answer.
    pub fn last_response(&self) -> Option<String> {
        self.lock().last_response.clone()
    }

    /// Install a new transport, replacing any previous one.
    ///
    /// Every stored event is queued on `tx` before the transport becomes
    /// visible to other callers, so replay always precedes live traffic.
    /// Returns the generation the socket's reader must report with.
    pub fn attach(&self, tx: OutboundTx) -> u64 {
        let mut inner = self.lock();

        inner.generations += 1;
        let generation = inner.generations;

        for (record, first) in &inner.events {
            let _ = tx.send(ServerMessage::event(record, *first));
        }

        let first_attach = !inner.ever_attached;
        inner.ever_attached = true;
        inner.socket = Some(Outbound { tx, generation });

        if first_attach {
            // A select that started without any socket sends its request
            // once woken.
            self.permit.release(Delivery::Attached);
        } else {
            inner.send_pending();
        }

        info!(
            player = %self.player_id,
            generation,
            replayed = inner.events.len(),
            "socket attached"
        );
        generation
    }

    /// Drop the current socket. Frames already queued are still written.
    pub fn close(&self) {
        if let Some(socket) = self.lock().socket.take() {
            debug!(player = %self.player_id, generation = socket.generation, "socket closed");
        }
    }

    /// Reader callback: a frame arrived on socket `generation`.
    pub fn deliver(&self, generation: u64, frame: Value) {
        let mut inner = self.lock();

        let current = inner.socket.as_ref().map(|s| s.generation) == Some(generation);
        if !current {
            debug!(player = %self.player_id, generation, "frame from a replaced socket dropped");
            return;
        }
        if inner.pending.is_none() {
            debug!(player = %self.player_id, "frame with no request pending dropped");
            return;
        }

        inner.inbox.push_back(frame);
        // Supersedes an unconsumed `Attached` or `Disconnected`; the frame
        // itself waits in the inbox.
        self.permit.replace(Delivery::Frames);
    }

    /// Reader callback: socket `generation` reached end of stream.
    pub fn detach(&self, generation: u64) {
        let mut inner = self.lock();

        if inner.socket.as_ref().map(|s| s.generation) != Some(generation) {
            return;
        }
        inner.socket = None;
        info!(player = %self.player_id, generation, "socket detached");

        if inner.pending.is_some() {
            self.permit.release(Delivery::Disconnected);
        }
    }

    /// Record an event and send it if a socket is attached.
    pub fn notify(&self, record: EventRecord, first: bool) {
        let mut inner = self.lock();
        inner.send(ServerMessage::event(&record, first));
        inner.events.push((record, first));
    }

    /// Send `request` and block until the player answers it.
    ///
    /// Malformed answers re-send the same request; frames of any other
    /// type are ignored. A disconnect keeps the request pending until a
    /// reconnect re-sends it.
    pub fn select(&self, request: &SelectRequest) -> String {
        {
            let mut inner = self.lock();
            self.permit.clear();
            inner.inbox.clear();
            inner.pending = Some(request.clone());
            inner.send_pending();
        }

        loop {
            match self.permit.acquire() {
                Delivery::Frames => {
                    if let Some(selected) = self.take_answer() {
                        return selected;
                    }
                }
                Delivery::Attached => self.lock().send_pending(),
                Delivery::Disconnected => {
                    debug!(player = %self.player_id, "waiting for reconnect");
                }
            }
        }
    }

    /// Check queued frames in order. The first valid answer completes the
    /// pending request and discards whatever arrived after it.
    fn take_answer(&self) -> Option<String> {
        let mut inner = self.lock();

        while let Some(frame) = inner.inbox.pop_front() {
            if !is_answer_attempt(&frame) {
                debug!(player = %self.player_id, "ignoring non-answer frame");
                continue;
            }
            match ClientMessage::from_value(frame) {
                Some(ClientMessage::OptionResponse { selected }) => {
                    inner.inbox.clear();
                    inner.pending = None;
                    inner.last_response = Some(selected.clone());
                    return Some(selected);
                }
                _ => {
                    debug!(player = %self.player_id, "malformed answer, asking again");
                    inner.send_pending();
                }
            }
        }

        None
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Anything but an object tagged with some other `type` counts as an
/// attempt to answer, and a malformed one is asked again.
fn is_answer_attempt(frame: &Value) -> bool {
    match frame.get("type").and_then(Value::as_str) {
        Some(kind) => kind == "option_response",
        None => true,
    }
}

impl PlayerIo for PlayerConnection {
    fn select(&self, request: &SelectRequest) -> String {
        PlayerConnection::select(self, request)
    }
}
