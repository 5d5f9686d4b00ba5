// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: updated entrypoint

use std::process::ExitCode;

use clap::Parser;
use log::error;

fn main() -> ExitCode {
    let cli = updated::Cli::parse();
    updated::init_logging(cli.verbose);
    match updated::run(&cli) {
        Ok(code) => code,
        Err(err) => {
            error!("updated: {err}");
            ExitCode::FAILURE
        }
    }
}
