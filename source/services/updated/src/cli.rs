// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: updated command line

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// Device update agent: streams an update image into the install engine.
#[derive(Parser, Debug)]
#[command(name = "updated", version, about, long_about = None)]
pub struct Cli {
    /// Settings file.
    #[arg(short, long, global = true, default_value = "/etc/updated.toml")]
    pub config: PathBuf,

    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install an update image (standard input when no file is given).
    Install(InstallArgs),
    /// Show what a description selects for this device.
    Describe(DescribeArgs),
}

/// Software set + running mode; both are needed for a selection to apply.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    #[arg(long, requires = "running_mode")]
    pub software_set: Option<String>,

    #[arg(long, requires = "software_set")]
    pub running_mode: Option<String>,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Update image.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Run the engine without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub selection: SelectionArgs,
}

#[derive(Args, Debug)]
pub struct DescribeArgs {
    /// Description file (TOML).
    #[arg(short = 'f', long)]
    pub file: PathBuf,

    #[arg(long)]
    pub board: Option<String>,

    /// Hardware revision to check against `hardware-compatibility`.
    #[arg(long)]
    pub revision: Option<String>,

    #[command(flatten)]
    pub selection: SelectionArgs,
}
