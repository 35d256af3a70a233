//! The command line interface for the experiment tools.
use crate::input::{parse_problem_path, read_problem};
use crate::log;
use crate::output;
use crate::settings::Settings;
use crate::solver::{Algorithm, SolveOptions, SolveOutcome, SolveReport, solve};
use crate::summary;
use ::log::{error, info, warn};
use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;

pub mod example;
use example::ExampleSubcommands;
mod settings;
use settings::SettingsSubcommands;

/// Exit code used when command-line arguments are rejected
const USAGE_EXIT_CODE: i32 = -1;

/// The command line interface for the experiment tools.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Read an optimisation problem and solve it with the chosen algorithm.
    Solve {
        /// Path to the problem file (.mps, .lp or .sav, optionally gzipped).
        #[arg(value_parser = parse_problem_path)]
        problem_file: PathBuf,
        /// The algorithm to solve with.
        #[arg(value_enum)]
        algorithm: Algorithm,
    },
    /// Collate experiment result files into a summary spreadsheet.
    Summarise {
        /// Directory containing the instance graphs and result files.
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
    /// Manage example problems.
    Example {
        /// The available subcommands for managing example problems.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Manage the program settings file.
    Settings {
        /// The available subcommands for managing settings.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Solve {
                problem_file,
                algorithm,
            } => handle_solve_command(&problem_file, algorithm, None),
            Self::Summarise { dir } => handle_summarise_command(&dir, None),
            Self::Example { subcommand } => subcommand.execute(),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and run the selected command
pub fn run_cli() -> Result<()> {
    let cli = Cli::try_parse().unwrap_or_else(|err| {
        if matches!(
            err.kind(),
            ErrorKind::DisplayHelp
                | ErrorKind::DisplayVersion
                | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        ) {
            err.exit();
        }

        // Bad arguments: print the error (which includes usage) and exit -1
        err.print().expect("Failed to write error");
        process::exit(USAGE_EXIT_CODE);
    });

    // Invoked as: `$ ebdtools --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        // Output program help
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Handle the `solve` command.
pub fn handle_solve_command(
    problem_path: &Path,
    algorithm: Algorithm,
    settings: Option<Settings>,
) -> Result<()> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // Initialise program logger (no log files for a one-shot solve)
    log::init(Some(&settings.log_level), None).context("Failed to initialise logging.")?;

    let problem = read_problem(problem_path).context("Failed to read problem.")?;
    info!(
        "Loaded problem '{}' from {} ({} columns, {} rows)",
        problem.name,
        problem_path.display(),
        problem.num_columns(),
        problem.num_rows()
    );

    let options = SolveOptions {
        solver_output: settings.solver_output,
        feasibility_tolerance: settings.feasibility_tolerance,
    };
    let outcome = match solve(&problem, algorithm, &options) {
        Ok(outcome) => outcome,
        Err(err) => {
            // The solver's failure modes are terminal; report and stop
            error!("Solve failed: {err:#}");
            return Ok(());
        }
    };

    print_outcome(algorithm, &outcome);

    Ok(())
}

/// Print a terminal solve outcome to stdout
fn print_outcome(algorithm: Algorithm, outcome: &SolveOutcome) {
    match outcome {
        SolveOutcome::Infeasible => println!("Solution status: infeasible"),
        SolveOutcome::Unbounded => println!("Solution status: unbounded"),
        SolveOutcome::InfeasibleOrUnbounded => {
            println!("Solution status: infeasible or unbounded")
        }
        SolveOutcome::Optimal(report) => print_report(algorithm, report),
    }
}

/// Print the solution report for an optimal solve
fn print_report(algorithm: Algorithm, report: &SolveReport) {
    println!("Solution status: optimal");
    println!("Solution method: {algorithm}");
    println!("Objective value: {}", report.objective);
    println!();

    for column in &report.columns {
        match column.status {
            Some(status) => println!("{:<12} {:>17.10}  {status}", column.name, column.value),
            None => println!("{:<12} {:>17.10}", column.name, column.value),
        }
    }

    println!("Maximum bound violation: {}", report.max_bound_violation);
}

/// Handle the `summarise` command.
pub fn handle_summarise_command(experiment_dir: &Path, settings: Option<Settings>) -> Result<()> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    let results_dir = experiment_dir.join(output::RESULTS_DIR_NAME);
    output::create_output_directory(&results_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            results_dir.display()
        )
    })?;

    // Initialise program logger; log files go next to the summary
    log::init(Some(&settings.log_level), Some(&results_dir))
        .context("Failed to initialise logging.")?;

    let outcome = summary::write_summary(experiment_dir)?;
    output::metadata::write_metadata(&results_dir, experiment_dir)?;

    info!(
        "Wrote {} summary rows to {}",
        outcome.rows_written,
        results_dir.join(output::SUMMARY_FILE_NAME).display()
    );
    if !outcome.failures.is_empty() {
        warn!(
            "{} result files could not be summarised:",
            outcome.failures.len()
        );
        for file_name in &outcome.failures {
            warn!("  {file_name}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use std::fs;
    use tempfile::tempdir;

    fn test_settings() -> Settings {
        Settings {
            log_level: "off".into(),
            ..Settings::default()
        }
    }

    #[test]
    fn test_handle_solve_command() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("production.lp");
        fs::write(
            &path,
            "max\n 3 x + 5 y\nsubject to\n c1: x <= 4\n c2: 2 y <= 12\n c3: 3 x + 2 y <= 18\nend\n",
        )
        .unwrap();

        handle_solve_command(&path, Algorithm::DualSimplex, Some(test_settings())).unwrap();
    }

    #[test]
    fn test_handle_solve_command_missing_file() {
        let result = handle_solve_command(
            Path::new("no_such_file.lp"),
            Algorithm::Automatic,
            Some(test_settings()),
        );
        assert_error!(result, "Failed to read problem.");
    }

    #[test]
    fn test_handle_summarise_command_missing_graphs() {
        let dir = tempdir().unwrap();

        // No instance graph files: the pass aborts after creating Results/
        let result = handle_summarise_command(dir.path(), Some(test_settings()));
        assert!(result.is_err());
        assert!(dir.path().join(output::RESULTS_DIR_NAME).is_dir());
    }

    #[test]
    fn test_cli_verification() {
        // Catch structural mistakes in the clap derive
        Cli::command().debug_assert();
    }
}
