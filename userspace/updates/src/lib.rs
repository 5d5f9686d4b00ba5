// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Update domain library (streaming install orchestration + description queries)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: Unit tests per module + integration tests (via tests/updates_host)
//!   - retry, success, failure and handshake paths of the orchestrator
//!   - pull stream chunking and error propagation
//!   - staging engine busy guard and digest
//!   - description root selection and image listing
//!
//! PUBLIC API:
//!   - Installer: blocking install facade (`install`, `install_from_source`)
//!   - InstallEngine / EngineSession / ImageStream / Completion: engine contract
//!   - PostUpdate / IpcPostUpdate / SocketPostUpdate: post-install handshake
//!   - StagingEngine: host engine writing `update.img`
//!   - description: software root selection, hardware compatibility, image list
//!
//! DEPENDENCIES:
//!   - nexus-config: description tree + `ref` resolution
//!   - nexus-ipc: handshake transport and wire format
//!   - sha2 + hex: staged image digest
//!   - parking_lot: short critical sections
//!   - thiserror: error enums
//!   - log: stage diagnostics

#![forbid(unsafe_code)]

pub mod description;
pub mod engine;
pub mod orchestrator;
pub mod postupdate;
pub mod request;
pub mod source;
pub mod staging;
pub mod stream;

pub use description::{ImageEntry, DEFAULT_MAX_HOPS};
pub use engine::{Completion, EngineSession, InstallEngine, StartError};
pub use orchestrator::{Installer, RetryPolicy};
#[cfg(unix)]
pub use postupdate::SocketPostUpdate;
pub use postupdate::{post_update, HandshakeError, IpcPostUpdate, PostUpdate};
pub use request::{InstallOutcome, InstallRequest, RecoveryStatus};
pub use source::ImageSource;
pub use staging::StagingEngine;
pub use stream::{ImageStream, CHUNK_SIZE};
