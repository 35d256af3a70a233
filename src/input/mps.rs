//! Reader for problems in MPS format.
//!
//! Free-format (whitespace-separated) MPS is supported, covering the sections
//! `NAME`, `OBJSENSE`, `ROWS`, `COLUMNS` (including `'MARKER'` integrality
//! toggles), `RHS`, `RANGES`, `BOUNDS` and `ENDATA`. The first `N` row is the
//! objective; any further `N` rows are kept as free rows. An `RHS` entry for
//! the objective row is interpreted as a negated constant term, per the MPS
//! convention.
use crate::problem::{ObjectiveSense, Problem};
use std::collections::HashMap;
use std::io::BufRead;
use thiserror::Error;

/// An error raised while reading an MPS file.
#[derive(Debug, Error)]
pub enum MpsError {
    /// The underlying reader failed
    #[error("failed to read input")]
    Io(#[from] std::io::Error),
    /// A section header was not recognised
    #[error("line {line}: unknown section '{name}'")]
    UnknownSection {
        /// Line on which the section header appears
        line: usize,
        /// The unrecognised header
        name: String,
    },
    /// A data record appeared before any section header
    #[error("line {line}: data before the first section header")]
    DataBeforeSection {
        /// Line on which the record appears
        line: usize,
    },
    /// A row type other than N, L, G or E was given
    #[error("line {line}: unknown row type '{kind}'")]
    UnknownRowType {
        /// Line on which the row is declared
        line: usize,
        /// The unrecognised row type
        kind: String,
    },
    /// A bound type outside the supported set was given
    #[error("line {line}: unknown bound type '{kind}'")]
    UnknownBoundType {
        /// Line on which the bound appears
        line: usize,
        /// The unrecognised bound type
        kind: String,
    },
    /// A record referenced a row that was never declared
    #[error("line {line}: unknown row '{name}'")]
    UnknownRow {
        /// Line on which the reference appears
        line: usize,
        /// The undeclared row name
        name: String,
    },
    /// A record referenced a column that was never declared
    #[error("line {line}: unknown column '{name}'")]
    UnknownColumn {
        /// Line on which the reference appears
        line: usize,
        /// The undeclared column name
        name: String,
    },
    /// A numeric field could not be parsed
    #[error("line {line}: invalid number '{token}'")]
    InvalidNumber {
        /// Line on which the field appears
        line: usize,
        /// The offending token
        token: String,
    },
    /// A record had the wrong number of fields for its section
    #[error("line {line}: malformed record")]
    Malformed {
        /// Line on which the record appears
        line: usize,
    },
    /// The OBJSENSE section held something other than a sense keyword
    #[error("line {line}: invalid objective sense '{token}'")]
    InvalidObjectiveSense {
        /// Line on which the sense appears
        line: usize,
        /// The offending token
        token: String,
    },
    /// The ROWS section declared no objective (N) row
    #[error("no objective row declared")]
    MissingObjective,
}

/// The sections of an MPS file which carry data records.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    ObjSense,
    Rows,
    Columns,
    Rhs,
    Ranges,
    Bounds,
}

/// Constraint row types, used to apply RHS and RANGES records.
#[derive(Clone, Copy, PartialEq, Eq)]
enum RowKind {
    Equal,
    LessEqual,
    GreaterEqual,
    Free,
}

/// Read an MPS-format problem from `reader`.
pub fn read_mps(reader: impl BufRead) -> Result<Problem, MpsError> {
    let mut problem = Problem::default();
    let mut section = None;
    let mut objective_row: Option<String> = None;
    // Maps a row name to its index in the problem and its declared kind
    let mut row_info: HashMap<String, (usize, RowKind)> = HashMap::new();
    // Whether we are between INTORG and INTEND markers
    let mut integer_mode = false;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = index + 1;

        let trimmed = line.trim_end();
        if trimmed.is_empty() || trimmed.starts_with('*') {
            continue;
        }

        // Section headers start in the first column; data records are indented
        if !trimmed.starts_with(char::is_whitespace) {
            let mut fields = trimmed.split_whitespace();
            let header = fields.next().expect("non-empty line has a first field");
            section = match header.to_ascii_uppercase().as_str() {
                "NAME" => {
                    problem.name = fields.next().unwrap_or_default().to_string();
                    None
                }
                "OBJSENSE" => {
                    // The sense may follow on the same line or on the next
                    match fields.next() {
                        Some(token) => {
                            problem.sense = parse_objective_sense(token, line_no)?;
                            None
                        }
                        None => Some(Section::ObjSense),
                    }
                }
                "ROWS" => Some(Section::Rows),
                "COLUMNS" => Some(Section::Columns),
                "RHS" => Some(Section::Rhs),
                "RANGES" => Some(Section::Ranges),
                "BOUNDS" => Some(Section::Bounds),
                "ENDATA" => break,
                _ => {
                    return Err(MpsError::UnknownSection {
                        line: line_no,
                        name: header.to_string(),
                    })
                }
            };
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        match section {
            None => return Err(MpsError::DataBeforeSection { line: line_no }),
            Some(Section::ObjSense) => {
                let token = fields.first().expect("non-empty record");
                problem.sense = parse_objective_sense(token, line_no)?;
            }
            Some(Section::Rows) => {
                let [kind, name] = fields.as_slice() else {
                    return Err(MpsError::Malformed { line: line_no });
                };
                let kind = match kind.to_ascii_uppercase().as_str() {
                    "N" => {
                        if objective_row.is_none() {
                            objective_row = Some(name.to_string());
                            continue;
                        }
                        RowKind::Free
                    }
                    "L" => RowKind::LessEqual,
                    "G" => RowKind::GreaterEqual,
                    "E" => RowKind::Equal,
                    other => {
                        return Err(MpsError::UnknownRowType {
                            line: line_no,
                            kind: other.to_string(),
                        })
                    }
                };
                // Bounds are set for a zero RHS here; RHS records move them
                let (lower, upper) = match kind {
                    RowKind::Equal => (0.0, 0.0),
                    RowKind::LessEqual => (f64::NEG_INFINITY, 0.0),
                    RowKind::GreaterEqual => (0.0, f64::INFINITY),
                    RowKind::Free => (f64::NEG_INFINITY, f64::INFINITY),
                };
                let row = problem.add_row(name.to_string(), lower, upper);
                row_info.insert(name.to_string(), (row, kind));
            }
            Some(Section::Columns) => {
                if fields.contains(&"'MARKER'") {
                    if fields.contains(&"'INTORG'") {
                        integer_mode = true;
                    } else if fields.contains(&"'INTEND'") {
                        integer_mode = false;
                    }
                    continue;
                }

                let (name, entries) = fields.split_first().expect("non-empty record");
                if entries.is_empty() || entries.len() % 2 != 0 {
                    return Err(MpsError::Malformed { line: line_no });
                }

                let column = problem.column_entry(name);
                problem.column_mut(column).is_integer |= integer_mode;

                for pair in entries.chunks(2) {
                    let value = parse_number(pair[1], line_no)?;
                    if Some(pair[0]) == objective_row.as_deref() {
                        problem.column_mut(column).cost += value;
                    } else {
                        let &(row, _) = row_info.get(pair[0]).ok_or_else(|| {
                            MpsError::UnknownRow {
                                line: line_no,
                                name: pair[0].to_string(),
                            }
                        })?;
                        problem.row_mut(row).terms.push((column, value));
                    }
                }
            }
            Some(Section::Rhs) => {
                // First field is the RHS set name, which we do not use
                let Some((_, entries)) = fields.split_first() else {
                    return Err(MpsError::Malformed { line: line_no });
                };
                if entries.is_empty() || entries.len() % 2 != 0 {
                    return Err(MpsError::Malformed { line: line_no });
                }

                for pair in entries.chunks(2) {
                    let value = parse_number(pair[1], line_no)?;
                    if Some(pair[0]) == objective_row.as_deref() {
                        problem.objective_offset = -value;
                        continue;
                    }
                    let &(row, kind) = row_info.get(pair[0]).ok_or_else(|| {
                        MpsError::UnknownRow {
                            line: line_no,
                            name: pair[0].to_string(),
                        }
                    })?;
                    let row = problem.row_mut(row);
                    match kind {
                        RowKind::Equal => (row.lower, row.upper) = (value, value),
                        RowKind::LessEqual => row.upper = value,
                        RowKind::GreaterEqual => row.lower = value,
                        RowKind::Free => {}
                    }
                }
            }
            Some(Section::Ranges) => {
                let Some((_, entries)) = fields.split_first() else {
                    return Err(MpsError::Malformed { line: line_no });
                };
                if entries.is_empty() || entries.len() % 2 != 0 {
                    return Err(MpsError::Malformed { line: line_no });
                }

                for pair in entries.chunks(2) {
                    let range = parse_number(pair[1], line_no)?;
                    let &(row, kind) = row_info.get(pair[0]).ok_or_else(|| {
                        MpsError::UnknownRow {
                            line: line_no,
                            name: pair[0].to_string(),
                        }
                    })?;
                    let row = problem.row_mut(row);
                    match kind {
                        RowKind::LessEqual => row.lower = row.upper - range.abs(),
                        RowKind::GreaterEqual => row.upper = row.lower + range.abs(),
                        RowKind::Equal => {
                            if range >= 0.0 {
                                row.upper = row.lower + range;
                            } else {
                                row.lower = row.upper + range;
                            }
                        }
                        RowKind::Free => {}
                    }
                }
            }
            Some(Section::Bounds) => apply_bound(&mut problem, &fields, line_no)?,
        }
    }

    if objective_row.is_none() {
        return Err(MpsError::MissingObjective);
    }

    Ok(problem)
}

/// Parse a MIN/MAX keyword from an OBJSENSE section
fn parse_objective_sense(token: &str, line: usize) -> Result<ObjectiveSense, MpsError> {
    match token.to_ascii_uppercase().as_str() {
        "MIN" | "MINIMIZE" => Ok(ObjectiveSense::Minimise),
        "MAX" | "MAXIMIZE" => Ok(ObjectiveSense::Maximise),
        _ => Err(MpsError::InvalidObjectiveSense {
            line,
            token: token.to_string(),
        }),
    }
}

fn parse_number(token: &str, line: usize) -> Result<f64, MpsError> {
    token.parse().map_err(|_| MpsError::InvalidNumber {
        line,
        token: token.to_string(),
    })
}

/// Apply one BOUNDS record to the named column.
///
/// Records normally read `TYPE SET COLUMN [VALUE]`, but the set name is
/// sometimes omitted in the wild; a three-field record whose last field parses
/// as a number is accepted in that spirit.
fn apply_bound(problem: &mut Problem, fields: &[&str], line: usize) -> Result<(), MpsError> {
    let kind = fields[0].to_ascii_uppercase();
    let takes_value = matches!(kind.as_str(), "LO" | "UP" | "FX" | "LI" | "UI");

    let (name, value) = match (fields.len(), takes_value) {
        (4, true) => (fields[2], Some(parse_number(fields[3], line)?)),
        (3, true) => (fields[1], Some(parse_number(fields[2], line)?)),
        (3, false) => (fields[2], None),
        (2, false) => (fields[1], None),
        _ => return Err(MpsError::Malformed { line }),
    };

    let column = problem
        .column_index(name)
        .ok_or_else(|| MpsError::UnknownColumn {
            line,
            name: name.to_string(),
        })?;
    let column = problem.column_mut(column);

    match (kind.as_str(), value) {
        ("LO", Some(value)) => column.lower = value,
        ("UP", Some(value)) => column.upper = value,
        ("FX", Some(value)) => (column.lower, column.upper) = (value, value),
        ("FR", None) => (column.lower, column.upper) = (f64::NEG_INFINITY, f64::INFINITY),
        ("MI", None) => column.lower = f64::NEG_INFINITY,
        ("PL", None) => column.upper = f64::INFINITY,
        ("BV", None) => {
            (column.lower, column.upper) = (0.0, 1.0);
            column.is_integer = true;
        }
        ("LI", Some(value)) => {
            column.lower = value;
            column.is_integer = true;
        }
        ("UI", Some(value)) => {
            column.upper = value;
            column.is_integer = true;
        }
        _ => return Err(MpsError::UnknownBoundType { line, kind }),
    }

    Ok(())
}
