//! Provides the main entry point to the program.
use ebdtools::cli::run_cli;
use ebdtools::log::is_logger_initialised;
use human_panic::setup_panic;
use log::error;
use std::process::ExitCode;

fn main() -> ExitCode {
    setup_panic!();

    if let Err(err) = run_cli() {
        // The logger is only available once a command has set it up
        if is_logger_initialised() {
            error!("{err:?}");
        } else {
            eprintln!("Error: {err:?}");
        }
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
