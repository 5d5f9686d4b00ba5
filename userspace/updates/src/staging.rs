// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Host install engine that stages the streamed image on disk
//! OWNERS: @runtime
//! STATUS: Functional (host)
//! TEST_COVERAGE: 4 unit tests
//!
//! One session at a time: a second `start` while a worker is running is refused with
//! `StartError::Busy`. The image lands in `<staging_dir>/update.img` via a `.part` file
//! that is renamed once the stream ended cleanly. Dry runs only hash.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use log::{error, info};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::engine::{EngineSession, InstallEngine, StartError};
use crate::request::RecoveryStatus;
use crate::stream::{ImageStream, CHUNK_SIZE};

const STAGED_NAME: &str = "update.img";
const PART_NAME: &str = "update.img.part";

#[derive(Debug, Clone)]
pub struct StagingEngine {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    staging_dir: PathBuf,
    active: AtomicBool,
    last_digest: Mutex<Option<[u8; 32]>>,
}

impl StagingEngine {
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                staging_dir: staging_dir.into(),
                active: AtomicBool::new(false),
                last_digest: Mutex::new(None),
            }),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.inner.staging_dir
    }

    /// Location of the last successfully staged image.
    pub fn staged_path(&self) -> PathBuf {
        self.inner.staging_dir.join(STAGED_NAME)
    }

    /// SHA-256 of the last image streamed to completion (dry runs included).
    pub fn last_digest(&self) -> Option<[u8; 32]> {
        *self.inner.last_digest.lock()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }
}

impl InstallEngine for StagingEngine {
    fn start(&self, session: EngineSession) -> Result<(), StartError> {
        let claimed =
            self.inner.active.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire);
        if claimed.is_err() {
            return Err(StartError::Busy);
        }
        let inner = Arc::clone(&self.inner);
        let (request, stream, completion) = session.into_parts();
        let spawned = thread::Builder::new().name("updates-staging".into()).spawn(move || {
            let result = inner.stage(stream, request.dry_run);
            let status = match result {
                Ok(digest) => {
                    info!("updates: staged image sha256={}", hex::encode(digest));
                    *inner.last_digest.lock() = Some(digest);
                    RecoveryStatus::Success
                }
                Err(err) => {
                    error!("updates: staging failed: {err}");
                    RecoveryStatus::Failure
                }
            };
            // Release before completing so the next session can start right away.
            inner.active.store(false, Ordering::Release);
            completion.complete(status);
        });
        match spawned {
            Ok(_) => Ok(()),
            Err(err) => {
                // The closure (and the session in it) is gone; its completion already fired.
                self.inner.active.store(false, Ordering::Release);
                Err(StartError::Unavailable(err.to_string()))
            }
        }
    }
}

impl Inner {
    fn stage(&self, mut stream: ImageStream, dry_run: bool) -> io::Result<[u8; 32]> {
        if dry_run {
            let digest = copy_hashed(&mut stream, &mut io::sink())?;
            info!("updates: dry run, {} bytes discarded", stream.bytes_pulled());
            return Ok(digest);
        }
        fs::create_dir_all(&self.staging_dir)?;
        let part = self.staging_dir.join(PART_NAME);
        let result = self.write_part(&part, &mut stream);
        if result.is_err() {
            let _ = fs::remove_file(&part);
        }
        result
    }

    fn write_part(&self, part: &Path, stream: &mut ImageStream) -> io::Result<[u8; 32]> {
        let mut out = BufWriter::new(File::create(part)?);
        let digest = copy_hashed(stream, &mut out)?;
        out.into_inner().map_err(io::IntoInnerError::into_error)?.sync_all()?;
        fs::rename(part, self.staging_dir.join(STAGED_NAME))?;
        Ok(digest)
    }
}

fn copy_hashed(input: &mut dyn Read, out: &mut dyn Write) -> io::Result<[u8; 32]> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        hasher.update(&buf[..n]);
        out.write_all(&buf[..n])?;
    }
    out.flush()?;
    Ok(hasher.finalize().into())
}
