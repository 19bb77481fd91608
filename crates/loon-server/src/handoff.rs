//! Moving sockets into a session process.
//!
//! The manager and each session process share a unix stream socket. On it
//! the manager sends:
//! - first, the session's [`SessionSpec`] as one JSON line,
//! - then, per connecting player, its id as one line with the player's
//!   socket descriptor attached (`SCM_RIGHTS`) to the line's first byte.
//!
//! Stream sockets may merge or split lines across reads, so the receiver
//! keeps a byte buffer and a queue of descriptors and pairs them up one
//! line at a time. The sender closes its own descriptor only after the
//! kernel accepted the message, so exactly one process owns the socket at
//! any time.

use std::collections::VecDeque;
use std::io::{self, IoSlice, IoSliceMut};
use std::net::TcpStream;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use nix::cmsg_space;
use nix::sys::socket::{recvmsg, sendmsg, ControlMessage, ControlMessageOwned, MsgFlags};
use tokio::io::Interest;
use tokio::net::UnixStream;

use crate::session::SessionSpec;
use crate::types::Handoff;

/// Most descriptors accepted in one `recvmsg`.
const MAX_FDS_PER_READ: usize = 8;

#[derive(Debug)]
pub struct FdSender {
    stream: UnixStream,
}

impl FdSender {
    pub fn new(stream: UnixStream) -> Self {
        FdSender { stream }
    }

    pub async fn send_spec(&self, spec: &SessionSpec) -> io::Result<()> {
        let mut line = serde_json::to_vec(spec)?;
        line.push(b'\n');
        self.send_line(&line, None).await
    }

    /// Pass `handoff.stream` to the peer. The local copy is closed on
    /// return, whether or not the transfer succeeded.
    pub async fn send(&self, handoff: Handoff) -> io::Result<()> {
        let mut line = handoff.player_id.into_bytes();
        line.push(b'\n');
        self.send_line(&line, Some(handoff.stream.as_raw_fd())).await
    }

    async fn send_line(&self, line: &[u8], fd: Option<RawFd>) -> io::Result<()> {
        let socket = self.stream.as_raw_fd();
        let mut sent = 0;

        while sent < line.len() {
            let rest = &line[sent..];
            let attach = if sent == 0 { fd } else { None };
            let n = self
                .stream
                .async_io(Interest::WRITABLE, || {
                    let iov = [IoSlice::new(rest)];
                    let result = match attach {
                        Some(fd) => {
                            let fds = [fd];
                            let cmsg = [ControlMessage::ScmRights(&fds)];
                            sendmsg::<()>(socket, &iov, &cmsg, MsgFlags::empty(), None)
                        }
                        None => sendmsg::<()>(socket, &iov, &[], MsgFlags::empty(), None),
                    };
                    result.map_err(io::Error::from)
                })
                .await?;
            sent += n;
        }

        Ok(())
    }
}

#[derive(Debug)]
pub struct FdReceiver {
    stream: UnixStream,
    buffered: Vec<u8>,
    fds: VecDeque<OwnedFd>,
}

impl FdReceiver {
    pub fn new(stream: UnixStream) -> Self {
        FdReceiver {
            stream,
            buffered: Vec::new(),
            fds: VecDeque::new(),
        }
    }

    /// The first line on the channel. `Ok(None)` if the manager hung up
    /// before sending it.
    pub async fn recv_spec(&mut self) -> io::Result<Option<SessionSpec>> {
        match self.next_line().await? {
            Some(line) => Ok(Some(serde_json::from_slice(&line)?)),
            None => Ok(None),
        }
    }

    /// Next player socket. `Ok(None)` once the manager hung up.
    ///
    /// Cancel safe: everything read is kept in `self` between awaits.
    pub async fn recv(&mut self) -> io::Result<Option<Handoff>> {
        let Some(line) = self.next_line().await? else {
            return Ok(None);
        };

        let fd = self.fds.pop_front().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "handoff line without a descriptor")
        })?;

        Ok(Some(Handoff {
            player_id: String::from_utf8_lossy(&line).into_owned(),
            stream: TcpStream::from(fd),
        }))
    }

    async fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            if let Some(pos) = self.buffered.iter().position(|&b| b == b'\n') {
                let mut line: Vec<u8> = self.buffered.drain(..=pos).collect();
                line.pop();
                return Ok(Some(line));
            }

            let socket = self.stream.as_raw_fd();
            let mut buf = [0u8; 512];
            let (n, fds) = self
                .stream
                .async_io(Interest::READABLE, || {
                    let mut iov = [IoSliceMut::new(&mut buf)];
                    let mut space = cmsg_space!([RawFd; MAX_FDS_PER_READ]);
                    let msg = recvmsg::<()>(socket, &mut iov, Some(&mut space), MsgFlags::empty())
                        .map_err(io::Error::from)?;

                    let mut fds = Vec::new();
                    for cmsg in msg.cmsgs() {
                        if let ControlMessageOwned::ScmRights(received) = cmsg {
                            // SAFETY: the kernel just installed these
                            // descriptors in this process; nothing else
                            // refers to them yet.
                            fds.extend(
                                received
                                    .into_iter()
                                    .map(|fd| unsafe { OwnedFd::from_raw_fd(fd) }),
                            );
                        }
                    }
                    Ok((msg.bytes, fds))
                })
                .await?;

            self.fds.extend(fds);
            if n == 0 {
                return Ok(None);
            }
            self.buffered.extend_from_slice(&buf[..n]);
        }
    }
}
