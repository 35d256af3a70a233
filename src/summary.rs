//! The summarising pass over a directory of districting experiment results.
//!
//! Experiments are laid out on a fixed grid of instance file, district count
//! and balance tolerance. Each grid point that has run leaves behind a small
//! CSV whose name encodes the point; the summariser pulls a handful of cells
//! out of each by fixed row/column address and collates them into one
//! spreadsheet. Grid points without a readable result file are skipped and
//! recorded, since the grid legitimately contains holes.
use crate::output::{RESULTS_DIR_NAME, SummaryRow, SummaryWriter};
use anyhow::{Context, Result};
use csv::StringRecord;
use itertools::Itertools;
use log::{debug, warn};
use std::fs;
use std::path::Path;

/// The instance graph files covered by the summary
pub const INSTANCE_FILES: [&str; 2] = ["CARP_F6_p_graph.dat", "CARP_O12_g_graph.dat"];

/// The district counts covered by the summary
pub const DISTRICT_COUNTS: [u32; 9] = [2, 4, 6, 8, 10, 20, 30, 40, 50];

/// The balance tolerances covered by the summary
pub const TOLERANCES: [f64; 3] = [0.01, 0.1, 1.0];

/// The name of the per-experiment result file for one grid point
pub fn results_file_name(districts: u32, tolerance: f64, instance: &str) -> String {
    format!(
        "EBD_Cut_Set_vs_SP_Contiguity_no_dist_{districts}_tol_{tolerance}_prob_{instance}.csv"
    )
}

/// Node and edge counts read from an instance graph file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GraphSize {
    /// Number of nodes in the graph
    pub nodes: u32,
    /// Number of edges in the graph
    pub edges: u32,
}

/// Read the node and edge counts from an instance graph header.
///
/// The second field of the file's second line is the node count; the second
/// field of its third line is the edge count.
pub fn read_graph_size(path: &Path) -> Result<GraphSize> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut lines = contents.lines();

    let nodes = parse_header_count(lines.nth(1), path, 2)?;
    let edges = parse_header_count(lines.next(), path, 3)?;

    Ok(GraphSize { nodes, edges })
}

fn parse_header_count(line: Option<&str>, path: &Path, line_no: usize) -> Result<u32> {
    let line = line.with_context(|| format!("{} has no line {line_no}", path.display()))?;
    let field = line.split_whitespace().nth(1).with_context(|| {
        format!("{} line {line_no} has no second field", path.display())
    })?;

    field.parse().with_context(|| {
        format!("Invalid count '{field}' on line {line_no} of {}", path.display())
    })
}

/// The cells extracted from one per-experiment result file
struct ResultCells {
    num_threads: String,
    time_before: f64,
    time_for: f64,
    objective: f64,
    status: String,
    gap_fraction: f64,
}

// Fixed (row, column) cell addresses in a result file, 0-indexed
const THREADS_CELL: (usize, usize) = (1, 0);
const TIME_BEFORE_CELL: (usize, usize) = (3, 0);
const OBJECTIVE_CELL: (usize, usize) = (3, 1);
const TIME_FOR_CELL: (usize, usize) = (5, 0);
const GAP_CELL: (usize, usize) = (7, 1);
const STATUS_CELL: (usize, usize) = (7, 2);

/// Extract the summarised cells from the result file at `path`
fn read_result_cells(path: &Path) -> Result<ResultCells> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let records: Vec<StringRecord> = reader.records().try_collect()?;

    Ok(ResultCells {
        num_threads: cell(&records, THREADS_CELL)?.to_string(),
        time_before: parse_cell(&records, TIME_BEFORE_CELL)?,
        time_for: parse_cell(&records, TIME_FOR_CELL)?,
        objective: parse_cell(&records, OBJECTIVE_CELL)?,
        status: cell(&records, STATUS_CELL)?.to_string(),
        gap_fraction: parse_cell(&records, GAP_CELL)?,
    })
}

fn cell(records: &[StringRecord], (row, column): (usize, usize)) -> Result<&str> {
    let record = records
        .get(row)
        .with_context(|| format!("no row {row}"))?;

    record
        .get(column)
        .with_context(|| format!("row {row} has no column {column}"))
}

fn parse_cell(records: &[StringRecord], address: (usize, usize)) -> Result<f64> {
    let field = cell(records, address)?;
    field.trim().parse().with_context(|| {
        format!(
            "invalid number '{field}' at row {} column {}",
            address.0, address.1
        )
    })
}

/// The result of a summarising pass.
#[derive(Debug)]
pub struct SummaryOutcome {
    /// Number of data rows written
    pub rows_written: u32,
    /// Result files that could not be read, in grid order
    pub failures: Vec<String>,
}

/// Run the summarising pass over `experiment_dir`.
///
/// The summary is written to the `Results` folder under `experiment_dir`,
/// which must already exist. Grid points whose result file cannot be read
/// are skipped and recorded in the returned outcome; a missing or malformed
/// instance graph file aborts the whole pass.
pub fn write_summary(experiment_dir: &Path) -> Result<SummaryOutcome> {
    let mut writer = SummaryWriter::create(&experiment_dir.join(RESULTS_DIR_NAME))?;
    let mut failures = Vec::new();
    let mut instance_no = 1;

    for instance in INSTANCE_FILES {
        let graph = read_graph_size(&experiment_dir.join(instance))?;

        for (&districts, &tolerance) in DISTRICT_COUNTS.iter().cartesian_product(&TOLERANCES) {
            let file_name = results_file_name(districts, tolerance, instance);
            debug!("Reading {file_name}");

            let cells = match read_result_cells(&experiment_dir.join(&file_name)) {
                Ok(cells) => cells,
                Err(err) => {
                    warn!("Skipping {file_name}: {err:#}");
                    failures.push(file_name);
                    continue;
                }
            };

            writer.write_row(&SummaryRow {
                instance_no,
                instance_name: instance.to_string(),
                num_nodes: graph.nodes,
                num_edges: graph.edges,
                num_districts: districts,
                tolerance,
                num_threads: cells.num_threads,
                time_before: cells.time_before,
                time_for: cells.time_for,
                total_time: cells.time_before + cells.time_for,
                objective: cells.objective,
                status: cells.status,
                gap: round2(cells.gap_fraction * 100.0),
            })?;
            instance_no += 1;
        }
    }

    writer.flush()?;

    Ok(SummaryOutcome {
        rows_written: instance_no - 1,
        failures,
    })
}

/// Round to two decimal places
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    #[case(2, 0.01, "EBD_Cut_Set_vs_SP_Contiguity_no_dist_2_tol_0.01_prob_CARP_F6_p_graph.dat.csv")]
    #[case(50, 1.0, "EBD_Cut_Set_vs_SP_Contiguity_no_dist_50_tol_1_prob_CARP_F6_p_graph.dat.csv")]
    fn test_results_file_name(
        #[case] districts: u32,
        #[case] tolerance: f64,
        #[case] expected: &str,
    ) {
        assert_eq!(
            results_file_name(districts, tolerance, "CARP_F6_p_graph.dat"),
            expected
        );
    }

    #[test]
    fn test_read_graph_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.dat");
        fs::write(&path, "NAME CARP_F6_p\nVERTICES 60\nEDGES 90\n").unwrap();

        assert_eq!(
            read_graph_size(&path).unwrap(),
            GraphSize {
                nodes: 60,
                edges: 90
            }
        );
    }

    #[test]
    fn test_read_graph_size_short_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.dat");
        fs::write(&path, "NAME CARP_F6_p\nVERTICES 60\n").unwrap();

        assert!(read_graph_size(&path).is_err());
    }

    #[test]
    fn test_read_result_cells() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("result.csv");
        fs::write(
            &path,
            "No. of threads,\n\
             8,\n\
             Time before B&B&C,Objective\n\
             12.5,345.5\n\
             Time for B&B&C,\n\
             99.25,\n\
             Nodes,Gap,Status\n\
             120,0.0123,Optimal\n",
        )
        .unwrap();

        let cells = read_result_cells(&path).unwrap();
        assert_eq!(cells.num_threads, "8");
        assert_eq!(cells.time_before, 12.5);
        assert_eq!(cells.time_for, 99.25);
        assert_eq!(cells.objective, 345.5);
        assert_eq!(cells.status, "Optimal");
        assert_eq!(cells.gap_fraction, 0.0123);
    }

    #[test]
    fn test_read_result_cells_short_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("result.csv");
        fs::write(&path, "only,one,row\n").unwrap();

        let message = format!("{:#}", read_result_cells(&path).unwrap_err());
        assert!(message.contains("no row"), "got: {message}");
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(1.236), 1.24);
        assert_eq!(round2(100.0), 100.0);
    }
}
