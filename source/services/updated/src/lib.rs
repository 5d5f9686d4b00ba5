// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: updated agent: install and describe commands
//! OWNERS: @runtime
//! STATUS: Functional (host)
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Unit tests for settings, CLI and both commands
//!
//! PUBLIC API: run(), init_logging(), Settings, Cli
//! DEPENDS_ON: updates domain library, nexus-config, nexus-ipc

#![forbid(unsafe_code)]

pub mod cli;
pub mod settings;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use log::{info, warn};
use nexus_config::ConfigTree;
use updates::description::{self, DEFAULT_MAX_HOPS};
use updates::{InstallRequest, Installer, SocketPostUpdate, StagingEngine};

pub use cli::{Cli, Command, DescribeArgs, InstallArgs, SelectionArgs};
pub use settings::Settings;

/// Result type surfaced by the agent.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors emitted by the agent before an install outcome exists.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unable to read settings {}: {source}", path.display())]
    SettingsRead { path: PathBuf, source: io::Error },
    #[error("invalid settings {}: {source}", path.display())]
    SettingsParse { path: PathBuf, source: toml::de::Error },
    #[error(transparent)]
    Description(#[from] nexus_config::Error),
    #[error("description has no software section for this device")]
    NoSoftwareRoot,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Installs the `env_logger` backend; `verbose` raises the default `info` filter.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    // A logger may already be installed (tests, embedding); keep it.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .try_init();
}

pub fn run(cli: &Cli) -> Result<ExitCode> {
    let settings = Settings::load(&cli.config)?;
    match &cli.command {
        Command::Install(args) => Ok(install(&settings, args).into()),
        Command::Describe(args) => {
            let compatible = describe(args, &mut io::stdout().lock())?;
            Ok(if compatible { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
    }
}

fn request_for(dry_run: bool, selection: &SelectionArgs) -> InstallRequest {
    let mut request = InstallRequest::new(dry_run);
    request.software_set = selection.software_set.clone();
    request.running_mode = selection.running_mode.clone();
    request
}

pub fn install(settings: &Settings, args: &InstallArgs) -> updates::InstallOutcome {
    let engine = StagingEngine::new(settings.engine.staging_dir.clone());
    let handshake = SocketPostUpdate::new(settings.ipc.socket.clone(), settings.handshake_wait());
    let installer = Installer::new(engine, handshake)
        .with_retry(settings.retry_policy())
        .with_wait(settings.completion_wait());
    let request = request_for(args.dry_run, &args.selection);
    let source = updates::ImageSource::from_path(args.input.as_deref());
    info!("updated: installing from {source}");
    installer.install(source, request)
}

/// Prints the selected root's images. Returns whether the hardware revision (if any) matched.
pub fn describe(args: &DescribeArgs, out: &mut dyn Write) -> Result<bool> {
    let tree = ConfigTree::load(&args.file)?;
    let request = request_for(false, &args.selection);
    let root = description::select_root(&tree, args.board.as_deref(), &request, DEFAULT_MAX_HOPS)
        .ok_or(Error::NoSoftwareRoot)?;

    let mut compatible = true;
    if let Some(revision) = args.revision.as_deref() {
        compatible = description::hardware_compatible(root, revision);
        if !compatible {
            warn!("updated: hardware revision {revision} is not listed as compatible");
        }
        let verdict = if compatible { "compatible" } else { "incompatible" };
        writeln!(out, "hardware {revision}: {verdict}")?;
    }
    for image in description::images(root) {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}{}",
            image.name,
            image.filename,
            image.device,
            image.kind,
            image.version,
            if image.installed_directly { "\tstreamed" } else { "" }
        )?;
    }
    Ok(compatible)
}
