//! Code related to the embedded example problems and the CLI commands for solving them.
use super::handle_solve_command;
use crate::input::has_problem_extension;
use crate::settings::Settings;
use crate::solver::Algorithm;
use anyhow::{Context, Result, bail, ensure};
use clap::Subcommand;
use include_dir::{Dir, DirEntry, include_dir};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// The directory containing the example problems.
const EXAMPLES_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/demo_problems");

/// The available subcommands for managing example problems.
#[derive(Subcommand)]
pub enum ExampleSubcommands {
    /// List available examples.
    List,
    /// Provide information about the specified example.
    Info {
        /// The name of the example.
        name: String,
    },
    /// Extract an example problem to a new directory.
    Extract {
        /// The name of the example to extract.
        name: String,
        /// The destination folder for the example.
        new_path: Option<PathBuf>,
    },
    /// Solve an example.
    Solve {
        /// The name of the example to solve.
        name: String,
        /// The algorithm to solve with.
        #[arg(value_enum)]
        algorithm: Algorithm,
    },
}

impl ExampleSubcommands {
    /// Execute the supplied example subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::List => handle_example_list_command(),
            Self::Info { name } => handle_example_info_command(&name)?,
            Self::Extract {
                name,
                new_path: dest,
            } => handle_example_extract_command(&name, dest.as_deref())?,
            Self::Solve { name, algorithm } => {
                handle_example_solve_command(&name, algorithm, None)?
            }
        }

        Ok(())
    }
}

/// Handle the `example list` command.
fn handle_example_list_command() {
    for entry in EXAMPLES_DIR.dirs() {
        println!("{}", entry.path().display());
    }
}

/// Handle the `example info` command.
fn handle_example_info_command(name: &str) -> Result<()> {
    let path: PathBuf = [name, "README.txt"].iter().collect();
    let readme = EXAMPLES_DIR
        .get_file(path)
        .context("Example not found.")?
        .contents_utf8()
        .expect("README.txt is not UTF-8 encoded");

    println!("{readme}");

    Ok(())
}

/// Handle the `example extract` command
fn handle_example_extract_command(name: &str, dest: Option<&Path>) -> Result<()> {
    let dest = dest.unwrap_or(Path::new(name));
    extract_example(name, dest)
}

/// Extract the specified example to a new directory
fn extract_example(name: &str, new_path: &Path) -> Result<()> {
    // Find the subdirectory in EXAMPLES_DIR whose name matches `name`.
    let sub_dir = EXAMPLES_DIR.get_dir(name).context("Example not found.")?;

    ensure!(
        !new_path.exists(),
        "Destination directory {} already exists",
        new_path.display()
    );

    // Copy the contents of the subdirectory to the destination
    fs::create_dir(new_path)?;
    for entry in sub_dir.entries() {
        match entry {
            DirEntry::Dir(_) => panic!("Subdirectories in examples not supported"),
            DirEntry::File(f) => {
                let file_name = f.path().file_name().unwrap();
                let file_path = new_path.join(file_name);
                fs::write(&file_path, f.contents())?;
            }
        }
    }

    Ok(())
}

/// Find the problem file inside an extracted example directory
fn find_problem_file(dir: &Path) -> Result<PathBuf> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if has_problem_extension(&path) {
            return Ok(path);
        }
    }

    bail!("Example contains no problem file")
}

/// Handle the `example solve` command.
pub fn handle_example_solve_command(
    name: &str,
    algorithm: Algorithm,
    settings: Option<Settings>,
) -> Result<()> {
    let temp_dir = TempDir::new().context("Failed to create temporary directory.")?;
    let problem_dir = temp_dir.path().join(name);
    extract_example(name, &problem_dir)?;

    let problem_file = find_problem_file(&problem_dir)?;
    handle_solve_command(&problem_file, algorithm, settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_example_has_readme_and_problem() {
        let mut count = 0;
        for dir in EXAMPLES_DIR.dirs() {
            count += 1;
            let name = dir.path().to_str().unwrap();
            assert!(
                EXAMPLES_DIR.get_file(dir.path().join("README.txt")).is_some(),
                "example {name} has no README.txt"
            );
            assert!(
                dir.files()
                    .any(|file| has_problem_extension(file.path())),
                "example {name} has no problem file"
            );
        }
        assert!(count > 0, "no examples are embedded");
    }

    #[test]
    fn test_extract_example() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("production");
        extract_example("production", &dest).unwrap();

        assert!(dest.join("README.txt").is_file());
        assert!(find_problem_file(&dest).is_ok());

        // Extracting over an existing directory is refused
        assert!(extract_example("production", &dest).is_err());
    }

    #[test]
    fn test_unknown_example_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let result = extract_example("no_such_example", &temp_dir.path().join("x"));
        assert!(result.is_err());
    }
}
