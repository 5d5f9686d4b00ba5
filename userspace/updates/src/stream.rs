// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Pull-side image stream handed to install engines
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: 3 unit tests
//!
//! Each refill is one request/reply exchange with the orchestrator that owns the source:
//! the stream asks for data, the orchestrator answers with at most `CHUNK_SIZE` bytes,
//! end-of-data, or the read error it hit. Read errors therefore surface inside the engine.

use std::io::{self, Read};
use std::sync::mpsc::{Receiver, Sender};

use crate::request::RecoveryStatus;

/// Size of one transfer block.
pub const CHUNK_SIZE: usize = 16 * 1024;

/// Engine -> orchestrator traffic.
#[derive(Debug)]
pub(crate) enum Event {
    Pull,
    Done(RecoveryStatus),
}

/// Orchestrator -> engine answer to one pull.
#[derive(Debug)]
pub(crate) enum Chunk {
    Data(Vec<u8>),
    End,
    Failed(io::ErrorKind, String),
}

/// `Read` adapter over the orchestrator's source. Not `Sync`; one engine thread owns it.
#[derive(Debug)]
pub struct ImageStream {
    events: Sender<Event>,
    chunks: Receiver<Chunk>,
    pending: Vec<u8>,
    pos: usize,
    finished: bool,
    pulled: u64,
}

impl ImageStream {
    pub(crate) fn new(events: Sender<Event>, chunks: Receiver<Chunk>) -> Self {
        Self { events, chunks, pending: Vec::new(), pos: 0, finished: false, pulled: 0 }
    }

    /// Bytes received from the orchestrator so far.
    pub fn bytes_pulled(&self) -> u64 {
        self.pulled
    }

    fn refill(&mut self) -> io::Result<()> {
        self.events.send(Event::Pull).map_err(|_| orchestrator_gone())?;
        match self.chunks.recv() {
            Ok(Chunk::Data(bytes)) => {
                self.pulled += bytes.len() as u64;
                self.pending = bytes;
                self.pos = 0;
                Ok(())
            }
            Ok(Chunk::End) => {
                self.finished = true;
                Ok(())
            }
            Ok(Chunk::Failed(kind, msg)) => Err(io::Error::new(kind, msg)),
            Err(_) => Err(orchestrator_gone()),
        }
    }
}

impl Read for ImageStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pos >= self.pending.len() {
            if self.finished {
                return Ok(0);
            }
            self.refill()?;
        }
        let available = &self.pending[self.pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n;
        Ok(n)
    }
}

fn orchestrator_gone() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "image source closed")
}
