//! Common routines for reading input files.
//!
//! Problem files are located by their extension chain: `.mps` and `.lp`
//! select a format, `.sav` is recognised but unsupported, and a trailing
//! `.gz` wraps any of them in gzip compression.
use crate::problem::Problem;
use anyhow::{Context, Result, bail};
use flate2::read::GzDecoder;
use serde::de::DeserializeOwned;
use std::fs;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

pub mod lp;
pub mod mps;

/// The problem-file formats the reader understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProblemFormat {
    /// MPS format (see [`mps`])
    Mps,
    /// LP text format (see [`lp`])
    Lp,
}

/// The file extensions accepted for problem files
const PROBLEM_EXTENSIONS: [&str; 3] = ["mps", "lp", "sav"];

/// Whether the file at `path` is gzip-compressed, going by its extension
fn is_gzipped(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// The format-bearing extension of `path`, looking beneath a trailing `.gz`
fn format_extension(path: &Path) -> Option<String> {
    let path = if is_gzipped(path) {
        Path::new(path.file_stem()?)
    } else {
        path
    };

    Some(path.extension()?.to_str()?.to_ascii_lowercase())
}

/// Whether `path` carries one of the accepted problem-file extensions
pub fn has_problem_extension(path: &Path) -> bool {
    format_extension(path)
        .is_some_and(|ext| PROBLEM_EXTENSIONS.iter().any(|valid| ext == *valid))
}

/// Validate a problem-file path given on the command line.
///
/// Used as a clap value parser so that a bad path is rejected as a usage
/// error rather than at solve time.
pub fn parse_problem_path(arg: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(arg);
    if has_problem_extension(&path) {
        Ok(path)
    } else {
        Err(format!(
            "problem file must have a {} extension, optionally followed by .gz",
            PROBLEM_EXTENSIONS.map(|ext| format!(".{ext}")).join(", ")
        ))
    }
}

/// Open a problem file, transparently decompressing a `.gz` one
fn open_problem_file(path: &Path) -> Result<Box<dyn BufRead>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    if is_gzipped(path) {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Read an optimisation problem from `path`, choosing the format by extension.
pub fn read_problem(path: &Path) -> Result<Problem> {
    let format = match format_extension(path).as_deref() {
        Some("mps") => ProblemFormat::Mps,
        Some("lp") => ProblemFormat::Lp,
        Some("sav") => bail!("SAV problem files are a binary format and are not supported"),
        _ => bail!(
            "Cannot determine problem format of {}: unrecognised extension",
            path.display()
        ),
    };

    let reader = open_problem_file(path)?;
    let mut problem = match format {
        ProblemFormat::Mps => mps::read_mps(reader).map_err(anyhow::Error::from),
        ProblemFormat::Lp => lp::read_lp(reader).map_err(anyhow::Error::from),
    }
    .with_context(|| format!("Failed to parse {}", path.display()))?;

    if problem.name.is_empty() {
        // LP files carry no problem name; fall back to the file name
        problem.name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
    }

    Ok(problem)
}

/// Read and deserialise a TOML file.
///
/// # Arguments
///
/// * `file_path`: Path to the TOML file
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let contents = fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read {}", file_path.display()))?;

    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", file_path.display()))
}
