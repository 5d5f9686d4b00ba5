// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Install engine contract (start, pull, completion)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: 2 unit tests + orchestrator tests
//!
//! An engine accepts an [`EngineSession`] and runs it on an execution context of its own.
//! The session carries the request, the pull side of the image ([`ImageStream`]) and a
//! single-use [`Completion`]. Engines must stop pulling before they complete.

use std::sync::mpsc::{self, Receiver, Sender};

use log::warn;
use thiserror::Error;

use crate::request::{InstallRequest, RecoveryStatus};
use crate::stream::{Chunk, Event, ImageStream};

/// Reasons an engine refuses to start; all of them are treated as transient.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    #[error("install engine busy")]
    Busy,
    #[error("install engine unavailable: {0}")]
    Unavailable(String),
}

pub trait InstallEngine: Send + Sync {
    /// Takes ownership of `session` and begins installing in the background.
    fn start(&self, session: EngineSession) -> Result<(), StartError>;
}

impl<E: InstallEngine + ?Sized> InstallEngine for std::sync::Arc<E> {
    fn start(&self, session: EngineSession) -> Result<(), StartError> {
        (**self).start(session)
    }
}

/// Everything an engine needs for one run.
#[derive(Debug)]
pub struct EngineSession {
    request: InstallRequest,
    stream: ImageStream,
    completion: Completion,
}

impl EngineSession {
    pub fn request(&self) -> &InstallRequest {
        &self.request
    }

    pub fn into_parts(self) -> (InstallRequest, ImageStream, Completion) {
        (self.request, self.stream, self.completion)
    }
}

/// Orchestrator side of a session.
pub(crate) struct SessionLink {
    pub(crate) events: Receiver<Event>,
    pub(crate) chunks: Sender<Chunk>,
}

pub(crate) fn open_session(request: InstallRequest) -> (EngineSession, SessionLink) {
    let (event_tx, event_rx) = mpsc::channel();
    let (chunk_tx, chunk_rx) = mpsc::channel();
    let session = EngineSession {
        request,
        stream: ImageStream::new(event_tx.clone(), chunk_rx),
        completion: Completion { events: event_tx, fired: false },
    };
    (session, SessionLink { events: event_rx, chunks: chunk_tx })
}

/// Single-use completion signal. Dropping it unfired reports `Failure`.
#[derive(Debug)]
pub struct Completion {
    events: Sender<Event>,
    fired: bool,
}

impl Completion {
    pub fn complete(mut self, status: RecoveryStatus) {
        self.fire(status);
    }

    fn fire(&mut self, status: RecoveryStatus) {
        if self.fired {
            return;
        }
        self.fired = true;
        // The waiting side may already have given up; nothing left to wake then.
        let _ = self.events.send(Event::Done(status));
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if !self.fired {
            warn!("updates: completion dropped without a status, reporting failure");
            self.fire(RecoveryStatus::Failure);
        }
    }
}
