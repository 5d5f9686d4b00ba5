// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: updated settings file (TOML, every key optional)
//!
//! ```toml
//! [engine]
//! staging_dir = "/var/lib/updated/staging"
//! [retry]
//! attempts = 3
//! backoff_ms = 1000
//! [ipc]
//! socket = "/run/updated.sock"
//! timeout_ms = 5000
//! [install]
//! completion_timeout_ms = 600000   # deadline for the whole install, streaming included; absent: none
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use nexus_ipc::Wait;
use serde::Deserialize;
use updates::RetryPolicy;

use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub engine: EngineSettings,
    pub retry: RetrySettings,
    pub ipc: IpcSettings,
    pub install: InstallSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSettings {
    pub staging_dir: PathBuf,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self { staging_dir: PathBuf::from("/var/lib/updated/staging") }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self { attempts: policy.attempts, backoff_ms: policy.backoff.as_millis() as u64 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IpcSettings {
    pub socket: PathBuf,
    pub timeout_ms: u64,
}

impl Default for IpcSettings {
    fn default() -> Self {
        Self { socket: PathBuf::from("/run/updated.sock"), timeout_ms: 5_000 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallSettings {
    /// Total install deadline, counted from engine start.
    pub completion_timeout_ms: Option<u64>,
}

impl Settings {
    /// Reads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text)
                .map_err(|source| Error::SettingsParse { path: path.to_path_buf(), source }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("updated: no settings at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(Error::SettingsRead { path: path.to_path_buf(), source }),
        }
    }

    pub fn from_toml_str(text: &str) -> core::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry.attempts,
            backoff: Duration::from_millis(self.retry.backoff_ms),
        }
    }

    pub fn handshake_wait(&self) -> Wait {
        Wait::Timeout(Duration::from_millis(self.ipc.timeout_ms))
    }

    /// Deadline for the whole install run, not just the wait after the last byte.
    pub fn completion_wait(&self) -> Wait {
        match self.install.completion_timeout_ms {
            Some(ms) => Wait::Timeout(Duration::from_millis(ms)),
            None => Wait::Blocking,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("updated.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.retry_policy(), RetryPolicy::default());
        assert_eq!(settings.completion_wait(), Wait::Blocking);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let settings = Settings::from_toml_str(
            "[retry]\nbackoff_ms = 50\n[install]\ncompletion_timeout_ms = 2000\n",
        )
        .unwrap();
        assert_eq!(settings.retry.attempts, 3);
        assert_eq!(settings.retry_policy().backoff, Duration::from_millis(50));
        assert_eq!(settings.completion_wait(), Wait::Timeout(Duration::from_secs(2)));
        assert_eq!(settings.ipc, IpcSettings::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("updated.toml");
        fs::write(&path, "[engine]\nstagingdir = \"/tmp\"\n").unwrap();
        assert!(matches!(Settings::load(&path), Err(Error::SettingsParse { .. })));
    }
}
