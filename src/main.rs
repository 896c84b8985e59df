//! `provision` binary: idempotent developer server provisioning.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use provision_cli::cli::{Cli, Command};
use provision_cli::commands;
use provision_cli::error::exit_code;
use provision_cli::logging::{self, Log as _, Logger};
use provision_cli::tasks::SystemAccess;

fn main() -> ExitCode {
    let args = Cli::parse();
    let command = args.resolved_command();

    if matches!(command, Command::Version) {
        commands::version::run();
        return ExitCode::SUCCESS;
    }

    logging::init_subscriber(args.verbose, command.log_name());
    let log = Arc::new(Logger::new(command.log_name()));

    let result = match &command {
        Command::Install(opts) => {
            commands::install::run(&args.global, opts, &log, SystemAccess::host())
        }
        Command::Status => commands::status::run(&args.global, &log, SystemAccess::host()),
        Command::Version => Ok(()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Task failures were already reported when they were recorded.
            if !log.has_failures() {
                log.error(&format!("{e:#}"));
            }
            ExitCode::from(exit_code(&e))
        }
    }
}
