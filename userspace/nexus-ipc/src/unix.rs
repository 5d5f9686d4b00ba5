// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Unix domain socket IPC backend (host daemons and the update agent)
//!
//! OWNERS: @runtime
//!
//! PUBLIC API:
//!   - UnixClient::connect(): stream connection to a listening daemon
//!   - UnixServer::bind() / accept(): listening side, one `UnixConnection` per peer
//!
//! WIRE:
//!   - Every frame is a little-endian `u32` length followed by that many bytes
//!   - Frames above `MAX_FRAME` are rejected on both send and receive
//!   - A wait that expires after part of a length header arrived leaves the stream out of
//!     step; the connection is then marked broken and every later call is `Disconnected`
//!
//! ERROR CONDITIONS:
//!   - IpcError::Disconnected: peer closed the stream (EOF, reset, broken pipe)
//!   - IpcError::Timeout: `Wait::Timeout` elapsed before a frame arrived
//!   - IpcError::WouldBlock: `Wait::NonBlocking` and nothing pending
//!   - IpcError::Io: any other socket failure (kind preserved)

use std::io::{self, Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;

use crate::{Client, IpcError, Result, Server, Wait};

/// Upper bound for a single frame payload.
pub const MAX_FRAME: usize = 64 * 1024;

/// Client connected to a daemon's Unix socket.
pub struct UnixClient {
    link: Framed,
}

impl UnixClient {
    /// Connects to the socket at `path`.
    pub fn connect(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path).map_err(|err| {
            debug!("ipc: connect {} failed: {err}", path.display());
            map_io(err, Wait::Blocking)
        })?;
        Ok(Self { link: Framed::new(stream) })
    }
}

impl Client for UnixClient {
    fn send(&self, frame: &[u8], wait: Wait) -> Result<()> {
        self.link.send(frame, wait)
    }

    fn recv(&self, wait: Wait) -> Result<Vec<u8>> {
        self.link.recv(wait)
    }
}

/// Listening endpoint; removes its socket path on drop.
pub struct UnixServer {
    listener: UnixListener,
    path: PathBuf,
}

impl UnixServer {
    /// Binds a listener at `path`, replacing a stale socket file.
    pub fn bind(path: &Path) -> Result<Self> {
        if path.exists() {
            std::fs::remove_file(path).map_err(|err| map_io(err, Wait::Blocking))?;
        }
        let listener = UnixListener::bind(path).map_err(|err| map_io(err, Wait::Blocking))?;
        Ok(Self { listener, path: path.to_path_buf() })
    }

    /// Blocks until a peer connects.
    pub fn accept(&self) -> Result<UnixConnection> {
        let (stream, _) = self.listener.accept().map_err(|err| map_io(err, Wait::Blocking))?;
        Ok(UnixConnection { link: Framed::new(stream) })
    }

    /// Path the listener is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UnixServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Server side of one accepted connection.
pub struct UnixConnection {
    link: Framed,
}

impl Server for UnixConnection {
    fn recv(&self, wait: Wait) -> Result<Vec<u8>> {
        self.link.recv(wait)
    }

    fn send(&self, frame: &[u8], wait: Wait) -> Result<()> {
        self.link.send(frame, wait)
    }
}

/// Length-prefixed framing over one stream, shared by both ends.
struct Framed {
    stream: UnixStream,
    broken: AtomicBool,
}

impl Framed {
    fn new(stream: UnixStream) -> Self {
        Self { stream, broken: AtomicBool::new(false) }
    }

    fn send(&self, frame: &[u8], wait: Wait) -> Result<()> {
        if self.broken.load(Ordering::Acquire) {
            return Err(IpcError::Disconnected);
        }
        write_frame(&self.stream, frame).map_err(|err| map_io(err, wait))
    }

    fn recv(&self, wait: Wait) -> Result<Vec<u8>> {
        if self.broken.load(Ordering::Acquire) {
            return Err(IpcError::Disconnected);
        }
        let (result, torn) = read_frame(&self.stream, wait);
        if torn {
            debug!("ipc: wait expired inside a frame header, dropping connection");
            self.broken.store(true, Ordering::Release);
        }
        result
    }
}

fn write_frame(mut stream: &UnixStream, frame: &[u8]) -> io::Result<()> {
    if frame.len() > MAX_FRAME {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "frame too large"));
    }
    stream.set_nonblocking(false)?;
    let len = u32::try_from(frame.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "frame too large"))?;
    stream.write_all(&len.to_le_bytes())?;
    stream.write_all(frame)?;
    stream.flush()
}

/// Reads one frame. The flag is set when the wait expired after part of the header arrived.
fn read_frame(stream: &UnixStream, wait: Wait) -> (Result<Vec<u8>>, bool) {
    let mut len = [0u8; 4];
    let mut got = 0;
    if let Err(err) = apply_wait(stream, wait) {
        return (Err(map_io(err, wait)), false);
    }
    let mut reader = stream;
    while got < len.len() {
        match reader.read(&mut len[got..]) {
            Ok(0) => return (Err(IpcError::Disconnected), false),
            Ok(n) => got += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                let expired =
                    matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut);
                return (Err(map_io(err, wait)), expired && got > 0);
            }
        }
    }
    (read_payload(stream, u32::from_le_bytes(len) as usize, wait), false)
}

fn read_payload(mut stream: &UnixStream, len: usize, wait: Wait) -> Result<Vec<u8>> {
    if len > MAX_FRAME {
        return Err(IpcError::Io(io::ErrorKind::InvalidData));
    }
    // The header is in; finish the frame even if the caller asked not to block.
    apply_wait(stream, Wait::Blocking).map_err(|err| map_io(err, wait))?;
    let mut frame = vec![0u8; len];
    stream.read_exact(&mut frame).map_err(|err| map_io(err, wait))?;
    Ok(frame)
}

fn apply_wait(stream: &UnixStream, wait: Wait) -> io::Result<()> {
    if wait.is_non_blocking() {
        return stream.set_nonblocking(true);
    }
    match wait.timeout() {
        Some(timeout) if timeout.is_zero() => stream.set_nonblocking(true),
        timeout => {
            stream.set_nonblocking(false)?;
            stream.set_read_timeout(timeout)
        }
    }
}

fn map_io(err: io::Error, wait: Wait) -> IpcError {
    match err.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => match wait.timeout() {
            Some(timeout) if !timeout.is_zero() => IpcError::Timeout,
            _ => IpcError::WouldBlock,
        },
        io::ErrorKind::UnexpectedEof
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::NotFound => IpcError::Disconnected,
        kind => IpcError::Io(kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn frames_survive_the_socket() {
        let dir = TempDir::new().unwrap();
        let server = UnixServer::bind(&dir.path().join("ctl.sock")).unwrap();
        let path = server.path().to_path_buf();
        let peer = thread::spawn(move || {
            let conn = server.accept().unwrap();
            let req = conn.recv(Wait::Blocking).unwrap();
            conn.send(&req, Wait::Blocking).unwrap();
            conn.send(&[], Wait::Blocking).unwrap();
        });

        let client = UnixClient::connect(&path).unwrap();
        client.send(b"hello", Wait::Blocking).unwrap();
        assert_eq!(client.recv(Wait::Timeout(Duration::from_secs(5))).unwrap(), b"hello");
        assert_eq!(client.recv(Wait::Blocking).unwrap(), Vec::<u8>::new());
        peer.join().unwrap();
        assert_eq!(client.recv(Wait::Blocking), Err(IpcError::Disconnected));
    }

    #[test]
    fn recv_times_out_without_reply() {
        let dir = TempDir::new().unwrap();
        let server = UnixServer::bind(&dir.path().join("ctl.sock")).unwrap();
        let client = UnixClient::connect(server.path()).unwrap();
        let _conn = server.accept().unwrap();
        let err = client.recv(Wait::Timeout(Duration::from_millis(20))).unwrap_err();
        assert_eq!(err, IpcError::Timeout);
        assert_eq!(client.recv(Wait::NonBlocking), Err(IpcError::WouldBlock));
    }

    #[test]
    fn torn_header_breaks_the_connection() {
        let dir = TempDir::new().unwrap();
        let server = UnixServer::bind(&dir.path().join("ctl.sock")).unwrap();
        let client = UnixClient::connect(server.path()).unwrap();
        let conn = server.accept().unwrap();

        let mut raw = &conn.link.stream;
        raw.write_all(&5u32.to_le_bytes()[..2]).unwrap();
        let err = client.recv(Wait::Timeout(Duration::from_millis(50))).unwrap_err();
        assert_eq!(err, IpcError::Timeout);

        // The rest of the frame arrives, but the stream can no longer be trusted.
        raw.write_all(&5u32.to_le_bytes()[2..]).unwrap();
        raw.write_all(b"hello").unwrap();
        assert_eq!(client.recv(Wait::Blocking), Err(IpcError::Disconnected));
        assert_eq!(client.send(b"again", Wait::Blocking), Err(IpcError::Disconnected));
    }

    #[test]
    fn idle_timeout_keeps_the_connection() {
        let dir = TempDir::new().unwrap();
        let server = UnixServer::bind(&dir.path().join("ctl.sock")).unwrap();
        let client = UnixClient::connect(server.path()).unwrap();
        let conn = server.accept().unwrap();

        assert_eq!(client.recv(Wait::Timeout(Duration::from_millis(20))), Err(IpcError::Timeout));
        conn.send(b"late", Wait::Blocking).unwrap();
        assert_eq!(client.recv(Wait::Timeout(Duration::from_secs(5))).unwrap(), b"late");
    }

    #[test]
    fn connect_to_missing_socket_is_disconnected() {
        let dir = TempDir::new().unwrap();
        let err = UnixClient::connect(&dir.path().join("absent.sock")).err().unwrap();
        assert_eq!(err, IpcError::Disconnected);
    }

    #[test]
    fn oversized_frames_are_refused() {
        let dir = TempDir::new().unwrap();
        let server = UnixServer::bind(&dir.path().join("ctl.sock")).unwrap();
        let client = UnixClient::connect(server.path()).unwrap();
        let err = client.send(&vec![0u8; MAX_FRAME + 1], Wait::Blocking).unwrap_err();
        assert_eq!(err, IpcError::Io(io::ErrorKind::InvalidInput));
    }
}
