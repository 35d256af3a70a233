//! Tools for running and summarising edge-based districting (EBD) optimisation experiments.
#![warn(missing_docs)]
pub mod cli;
pub mod input;
pub mod log;
pub mod output;
pub mod problem;
pub mod settings;
pub mod solver;
pub mod summary;

#[cfg(test)]
mod fixture;

use std::path::PathBuf;

/// Get the directory in which the program's configuration is stored
pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .expect("Could not determine configuration directory")
        .join("ebdtools")
}
