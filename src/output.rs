//! The module responsible for writing output data to disk.
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::Path;

pub mod metadata;

/// The folder in which the summary and run metadata are written
pub const RESULTS_DIR_NAME: &str = "Results";

/// The output file name for the summary spreadsheet
pub const SUMMARY_FILE_NAME: &str = "Summary_Branch_Cut_SPC_ECPM.csv";

/// Column headers of the summary spreadsheet, written even when no row is
const SUMMARY_HEADER: [&str; 13] = [
    "Instance_no",
    "Instance_name",
    "No. of Nodes",
    "No. of Edges",
    "No. of Districts",
    "tolerance",
    "No. of Threads",
    "Time_Before_B&B&C",
    "Time_for_B&B&C",
    "Total_Time",
    "Objective_Function_B&B&C",
    "Sol_Status_B&B&C",
    "gap",
];

/// Create the output directory if it does not exist yet.
pub fn create_output_directory(output_dir: &Path) -> Result<()> {
    if output_dir.is_dir() {
        // already exists
        return Ok(());
    }

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(())
}

/// A row of the summary spreadsheet.
///
/// The serde renames reproduce the original spreadsheet's header names.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct SummaryRow {
    /// Running number of the summarised experiment
    #[serde(rename = "Instance_no")]
    pub instance_no: u32,
    /// File name of the problem instance
    #[serde(rename = "Instance_name")]
    pub instance_name: String,
    /// Number of nodes in the instance graph
    #[serde(rename = "No. of Nodes")]
    pub num_nodes: u32,
    /// Number of edges in the instance graph
    #[serde(rename = "No. of Edges")]
    pub num_edges: u32,
    /// Number of districts in the experiment
    #[serde(rename = "No. of Districts")]
    pub num_districts: u32,
    /// Balance tolerance of the experiment
    #[serde(rename = "tolerance")]
    pub tolerance: f64,
    /// Thread count reported by the experiment
    #[serde(rename = "No. of Threads")]
    pub num_threads: String,
    /// Seconds spent before branch-and-bound-and-cut
    #[serde(rename = "Time_Before_B&B&C")]
    pub time_before: f64,
    /// Seconds spent in branch-and-bound-and-cut
    #[serde(rename = "Time_for_B&B&C")]
    pub time_for: f64,
    /// Sum of the two time columns
    #[serde(rename = "Total_Time")]
    pub total_time: f64,
    /// Objective value reached
    #[serde(rename = "Objective_Function_B&B&C")]
    pub objective: f64,
    /// Solution status reported by the experiment
    #[serde(rename = "Sol_Status_B&B&C")]
    pub status: String,
    /// Optimality gap in percent, rounded to 2 decimals
    #[serde(rename = "gap")]
    pub gap: f64,
}

/// An object for writing summary rows to file
pub struct SummaryWriter {
    writer: csv::Writer<File>,
}

impl SummaryWriter {
    /// Open the summary file in `output_dir` and write the header row.
    ///
    /// # Arguments
    ///
    /// * `output_dir` - Folder where the summary will be saved
    pub fn create(output_dir: &Path) -> Result<Self> {
        let file_path = output_dir.join(SUMMARY_FILE_NAME);
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(file_path)?;
        writer.write_record(SUMMARY_HEADER)?;

        Ok(Self { writer })
    }

    /// Append one row to the summary
    pub fn write_row(&mut self, row: &SummaryRow) -> Result<()> {
        self.writer.serialize(row)?;

        Ok(())
    }

    /// Flush the underlying stream
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use std::iter;
    use tempfile::tempdir;

    fn example_row() -> SummaryRow {
        SummaryRow {
            instance_no: 1,
            instance_name: "CARP_F6_p_graph.dat".into(),
            num_nodes: 60,
            num_edges: 90,
            num_districts: 4,
            tolerance: 0.01,
            num_threads: "8".into(),
            time_before: 12.5,
            time_for: 99.25,
            total_time: 111.75,
            objective: 345.5,
            status: "Optimal".into(),
            gap: 1.23,
        }
    }

    #[test]
    fn test_write_summary_row() {
        let dir = tempdir().unwrap();

        // Write a row
        {
            let mut writer = SummaryWriter::create(dir.path()).unwrap();
            writer.write_row(&example_row()).unwrap();
            writer.flush().unwrap();
        }

        // Read back and compare
        let records: Vec<SummaryRow> =
            csv::Reader::from_path(dir.path().join(SUMMARY_FILE_NAME))
                .unwrap()
                .into_deserialize()
                .try_collect()
                .unwrap();
        itertools::assert_equal(records, iter::once(example_row()));
    }

    #[test]
    fn test_header_is_written_without_rows() {
        let dir = tempdir().unwrap();

        {
            let mut writer = SummaryWriter::create(dir.path()).unwrap();
            writer.flush().unwrap();
        }

        let contents = fs::read_to_string(dir.path().join(SUMMARY_FILE_NAME)).unwrap();
        let header = contents.lines().next().unwrap();
        assert!(header.starts_with("Instance_no,Instance_name,"));
        assert_eq!(contents.lines().count(), 1);
    }

    #[test]
    fn test_create_output_directory() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("Results");

        create_output_directory(&output_dir).unwrap();
        assert!(output_dir.is_dir());

        // A second call is a no-op
        create_output_directory(&output_dir).unwrap();
    }
}
