// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: In-process IPC emulation for host-based testing
//!
//! OWNERS: @runtime
//!
//! PUBLIC API:
//!   - loopback_channel(): Create client/server pair backed by in-memory channels
//!   - struct LoopbackClient: Client implementation for in-process testing
//!   - struct LoopbackServer: Server implementation for in-process testing
//!
//! ERROR CONDITIONS:
//!   - IpcError::Disconnected: Channel disconnected
//!   - IpcError::WouldBlock: Operation would block in non-blocking mode
//!   - IpcError::Timeout: Operation timed out
//!
//! DEPENDENCIES:
//!   - std::sync::mpsc: Channel-based communication
//!   - parking_lot::Mutex: Receiver guard (both endpoints are `Sync`)
//!
//! ADR: docs/adr/0003-ipc-runtime-architecture.md

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};

use parking_lot::Mutex;

use crate::{Client, IpcError, Result, Server, Wait};

/// Creates a loopback client/server pair backed by in-memory channels.
pub fn loopback_channel() -> (LoopbackClient, LoopbackServer) {
    let (req_tx, req_rx) = mpsc::channel::<Vec<u8>>();
    let (rsp_tx, rsp_rx) = mpsc::channel::<Vec<u8>>();
    (
        LoopbackClient { request_tx: Mutex::new(req_tx), response_rx: Mutex::new(rsp_rx) },
        LoopbackServer { request_rx: Mutex::new(req_rx), response_tx: Mutex::new(rsp_tx) },
    )
}

/// Client implementation backed by in-memory channels.
pub struct LoopbackClient {
    request_tx: Mutex<Sender<Vec<u8>>>,
    response_rx: Mutex<Receiver<Vec<u8>>>,
}

impl Client for LoopbackClient {
    fn send(&self, frame: &[u8], _wait: Wait) -> Result<()> {
        self.request_tx.lock().send(frame.to_vec()).map_err(|_| IpcError::Disconnected)
    }

    fn recv(&self, wait: Wait) -> Result<Vec<u8>> {
        recv_with(&self.response_rx.lock(), wait)
    }
}

/// Server implementation backed by in-memory channels.
pub struct LoopbackServer {
    request_rx: Mutex<Receiver<Vec<u8>>>,
    response_tx: Mutex<Sender<Vec<u8>>>,
}

impl Server for LoopbackServer {
    fn recv(&self, wait: Wait) -> Result<Vec<u8>> {
        recv_with(&self.request_rx.lock(), wait)
    }

    fn send(&self, frame: &[u8], _wait: Wait) -> Result<()> {
        self.response_tx.lock().send(frame.to_vec()).map_err(|_| IpcError::Disconnected)
    }
}

fn recv_with(receiver: &Receiver<Vec<u8>>, wait: Wait) -> Result<Vec<u8>> {
    let try_once = || {
        receiver.try_recv().map_err(|err| match err {
            TryRecvError::Empty => IpcError::WouldBlock,
            TryRecvError::Disconnected => IpcError::Disconnected,
        })
    };
    if wait.is_non_blocking() {
        return try_once();
    }
    match wait.timeout() {
        None => receiver.recv().map_err(|_| IpcError::Disconnected),
        Some(timeout) if timeout.is_zero() => try_once(),
        Some(timeout) => receiver.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => IpcError::Timeout,
            RecvTimeoutError::Disconnected => IpcError::Disconnected,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn loopback_roundtrip() {
        let (client, server) = loopback_channel();
        client.send(b"ping", Wait::Blocking).unwrap();
        assert_eq!(server.recv(Wait::Blocking).unwrap(), b"ping");
        server.send(b"pong", Wait::Blocking).unwrap();
        assert_eq!(client.recv(Wait::Blocking).unwrap(), b"pong");
    }

    #[test]
    fn recv_timeout() {
        let (client, _server) = loopback_channel();
        let err = client.recv(Wait::Timeout(Duration::from_millis(10))).unwrap_err();
        assert_eq!(err, IpcError::Timeout);
        let err = client.recv(Wait::NonBlocking).unwrap_err();
        assert_eq!(err, IpcError::WouldBlock);
    }

    #[test]
    fn zero_timeout_polls_once() {
        let (client, server) = loopback_channel();
        assert_eq!(client.recv(Wait::Timeout(Duration::ZERO)), Err(IpcError::WouldBlock));
        server.send(b"ready", Wait::Blocking).unwrap();
        assert_eq!(client.recv(Wait::Timeout(Duration::ZERO)).unwrap(), b"ready");
    }

    #[test]
    fn dropped_peer_disconnects() {
        let (client, server) = loopback_channel();
        drop(server);
        assert_eq!(client.send(b"x", Wait::Blocking), Err(IpcError::Disconnected));
        assert_eq!(client.recv(Wait::Blocking), Err(IpcError::Disconnected));
    }

    #[test]
    fn server_replies_from_another_thread() {
        let (client, server) = loopback_channel();
        let peer = thread::spawn(move || {
            let req = server.recv(Wait::Blocking).unwrap();
            server.send(&req, Wait::Blocking).unwrap();
        });
        client.send(b"echo", Wait::Blocking).unwrap();
        assert_eq!(client.recv(Wait::Timeout(Duration::from_secs(5))).unwrap(), b"echo");
        peer.join().unwrap();
    }
}
