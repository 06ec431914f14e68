use std::process::ExitCode;

use ytd_core::logging;

mod cli;

use crate::cli::CliCommand;

fn main() -> ExitCode {
    // Prefer the log file; a read-only state dir must not stop downloads.
    if let Err(e) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("file logging unavailable, using stderr: {:#}", e);
    }

    match CliCommand::run_from_args() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("ytd error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
