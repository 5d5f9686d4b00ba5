// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Streaming install orchestrator (blocking facade over an async install engine)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: 11 unit tests + integration tests (via tests/updates_host)
//!
//! FLOW:
//!   1. open the source (failure: `Failure`, engine never started)
//!   2. start the engine, retrying transient refusals (`RetryPolicy`)
//!   3. serve pulls from a per-call 16 KiB buffer until the engine completes; a
//!      `Wait::Timeout` is one deadline for the whole run, counted from engine start,
//!      so time spent streaming the image counts against it
//!   4. on engine success run the post-update handshake; its failure overrides success
//!
//! INVARIANTS:
//!   - Exactly one outcome per call; the caller is woken exactly once
//!   - All transfer state (source, buffer, channels) is owned by the call, so concurrent
//!     installs on one `Installer` do not interfere
//!   - Stage detail goes to the log; the return value stays two-valued

use std::io::{self, Read};
use std::path::Path;
use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use nexus_ipc::Wait;

use crate::engine::{open_session, InstallEngine, SessionLink};
use crate::postupdate::PostUpdate;
use crate::request::{InstallOutcome, InstallRequest, RecoveryStatus};
use crate::source::ImageSource;
use crate::stream::{Chunk, Event, CHUNK_SIZE};

/// Engine start retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total start attempts, including the first.
    pub attempts: u32,
    /// Sleep between two attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: 3, backoff: Duration::from_secs(1) }
    }
}

pub struct Installer<E, P> {
    engine: E,
    post_update: P,
    retry: RetryPolicy,
    wait: Wait,
}

impl<E: InstallEngine, P: PostUpdate> Installer<E, P> {
    pub fn new(engine: E, post_update: P) -> Self {
        Self { engine, post_update, retry: RetryPolicy::default(), wait: Wait::Blocking }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Bounds the whole install run, streaming included, from the moment the engine starts.
    /// `NonBlocking` behaves like a zero timeout.
    pub fn with_wait(mut self, wait: Wait) -> Self {
        self.wait = wait;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Installs from `source` (standard input when `None`).
    pub fn install_from_source(&self, source: Option<&Path>, dry_run: bool) -> InstallOutcome {
        self.install(ImageSource::from_path(source), InstallRequest::new(dry_run))
    }

    pub fn install(&self, source: ImageSource, request: InstallRequest) -> InstallOutcome {
        let origin = source.to_string();
        let mut input = match source.open() {
            Ok(input) => input,
            Err(err) => {
                error!("updates: unable to open {origin}: {err}");
                return InstallOutcome::Failure;
            }
        };

        let Some(link) = self.start_engine(&request) else {
            error!("updates: install engine did not start after {} attempts", self.retry.attempts.max(1));
            return InstallOutcome::Failure;
        };
        debug!("updates: engine started for {origin} (dry_run={})", request.dry_run);

        let status = self.serve(link, &mut input);
        let outcome = self.conclude(status);
        drop(input);
        outcome
    }

    fn start_engine(&self, request: &InstallRequest) -> Option<SessionLink> {
        let attempts = self.retry.attempts.max(1);
        for attempt in 1..=attempts {
            let (session, link) = open_session(request.clone());
            match self.engine.start(session) {
                Ok(()) => return Some(link),
                Err(err) => {
                    warn!("updates: engine start {attempt}/{attempts} failed: {err}");
                    if attempt < attempts {
                        thread::sleep(self.retry.backoff);
                    }
                }
            }
        }
        None
    }

    /// Answers pulls until the engine reports a status. `None`: deadline passed or engine gone.
    fn serve(&self, link: SessionLink, input: &mut dyn Read) -> Option<RecoveryStatus> {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let deadline = match self.wait {
            Wait::Blocking => None,
            Wait::NonBlocking => Some(Instant::now()),
            Wait::Timeout(timeout) => Some(Instant::now() + timeout),
        };
        loop {
            let event = match deadline {
                None => link.events.recv().ok(),
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    match link.events.recv_timeout(left) {
                        Ok(event) => Some(event),
                        Err(RecvTimeoutError::Timeout) => {
                            error!("updates: install deadline passed ({:?})", self.wait);
                            return None;
                        }
                        Err(RecvTimeoutError::Disconnected) => None,
                    }
                }
            };
            match event {
                Some(Event::Pull) if deadline.is_some_and(|deadline| Instant::now() >= deadline) => {
                    error!("updates: install deadline passed while streaming ({:?})", self.wait);
                    return None;
                }
                Some(Event::Pull) => {
                    // A vanished engine just means nobody reads the answer.
                    let _ = link.chunks.send(read_chunk(input, &mut buf));
                }
                Some(Event::Done(status)) => return Some(status),
                None => {
                    error!("updates: install engine went away without a status");
                    return None;
                }
            }
        }
    }

    fn conclude(&self, status: Option<RecoveryStatus>) -> InstallOutcome {
        match status {
            Some(RecoveryStatus::Success) => {
                info!("updates: install was successful");
                match self.post_update.confirm() {
                    Ok(()) => InstallOutcome::Success,
                    Err(err) => {
                        error!("updates: post-update handshake failed: {err}");
                        InstallOutcome::Failure
                    }
                }
            }
            Some(RecoveryStatus::Failure) => {
                error!("updates: install *failed*");
                InstallOutcome::Failure
            }
            None => InstallOutcome::Failure,
        }
    }
}

fn read_chunk(input: &mut dyn Read, buf: &mut [u8]) -> Chunk {
    loop {
        match input.read(buf) {
            Ok(0) => return Chunk::End,
            Ok(n) => return Chunk::Data(buf[..n].to_vec()),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                warn!("updates: image read failed: {err}");
                return Chunk::Failed(err.kind(), err.to_string());
            }
        }
    }
}
