//! The in-memory representation of an optimisation problem.
//!
//! A [`Problem`] is produced by the readers in [`crate::input`] and consumed by
//! [`crate::solver`]. It is deliberately solver-agnostic: bounds are plain
//! `f64`s with `f64::INFINITY`/`f64::NEG_INFINITY` marking absent bounds, and
//! rows reference columns by index.
use indexmap::IndexMap;

/// Direction of the objective function.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ObjectiveSense {
    /// Minimise the objective function
    #[default]
    Minimise,
    /// Maximise the objective function
    Maximise,
}

/// A column (decision variable) of a problem.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    /// Coefficient of this column in the objective function
    pub cost: f64,
    /// Lower bound on the column's value
    pub lower: f64,
    /// Upper bound on the column's value
    pub upper: f64,
    /// Whether the column must take an integer value
    pub is_integer: bool,
}

impl Default for Column {
    fn default() -> Self {
        // The conventional default for LP file formats: nonnegative, continuous
        Self {
            cost: 0.0,
            lower: 0.0,
            upper: f64::INFINITY,
            is_integer: false,
        }
    }
}

/// A row (linear constraint) of a problem.
///
/// The row's activity is constrained to lie in `[lower, upper]`. Equality
/// constraints have `lower == upper`; free rows have both bounds infinite.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    /// Name of the row
    pub name: String,
    /// Lower bound on the row activity
    pub lower: f64,
    /// Upper bound on the row activity
    pub upper: f64,
    /// Sparse terms as (column index, coefficient) pairs
    pub terms: Vec<(usize, f64)>,
}

/// An optimisation problem: an objective over columns, subject to rows.
///
/// Columns are kept in insertion order (see [`IndexMap`]) so that solution
/// values reported by the solver can be zipped back against them.
#[derive(Debug, Default)]
pub struct Problem {
    /// Name of the problem, as given in the problem file
    pub name: String,
    /// Direction of the objective
    pub sense: ObjectiveSense,
    /// Constant term added to the objective value
    pub objective_offset: f64,
    columns: IndexMap<String, Column>,
    rows: Vec<Row>,
}

impl Problem {
    /// Create an empty problem with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Get the index of the column with the given name, creating it with
    /// default bounds if it does not exist yet.
    pub fn column_entry(&mut self, name: &str) -> usize {
        if let Some(index) = self.columns.get_index_of(name) {
            return index;
        }

        self.columns
            .insert_full(name.to_string(), Column::default())
            .0
    }

    /// Get the index of an existing column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.get_index_of(name)
    }

    /// Get a mutable reference to the column at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn column_mut(&mut self, index: usize) -> &mut Column {
        &mut self.columns[index]
    }

    /// Iterate over columns as (name, column) pairs, in insertion order
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(name, col)| (name.as_str(), col))
    }

    /// The number of columns
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Append a row and return its index
    pub fn add_row(&mut self, name: String, lower: f64, upper: f64) -> usize {
        self.rows.push(Row {
            name,
            lower,
            upper,
            terms: Vec::new(),
        });
        self.rows.len() - 1
    }

    /// The rows of the problem
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Get a mutable reference to the row at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn row_mut(&mut self, index: usize) -> &mut Row {
        &mut self.rows[index]
    }

    /// The number of rows
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Whether any column is integer-constrained
    pub fn is_mip(&self) -> bool {
        self.columns.values().any(|col| col.is_integer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_entry_reuses_existing() {
        let mut problem = Problem::new("test");
        let x = problem.column_entry("x");
        let y = problem.column_entry("y");
        assert_ne!(x, y);
        assert_eq!(problem.column_entry("x"), x);
        assert_eq!(problem.num_columns(), 2);
    }

    #[test]
    fn test_columns_preserve_insertion_order() {
        let mut problem = Problem::new("test");
        for name in ["z", "a", "m"] {
            problem.column_entry(name);
        }

        let names: Vec<_> = problem.columns().map(|(name, _)| name).collect();
        assert_eq!(names, ["z", "a", "m"]);
    }

    #[test]
    fn test_default_column_bounds() {
        let mut problem = Problem::new("test");
        let x = problem.column_entry("x");
        let column = problem.column_mut(x);
        assert_eq!(column.lower, 0.0);
        assert_eq!(column.upper, f64::INFINITY);
        assert!(!column.is_integer);
    }

    #[test]
    fn test_is_mip() {
        let mut problem = Problem::new("test");
        let x = problem.column_entry("x");
        assert!(!problem.is_mip());
        problem.column_mut(x).is_integer = true;
        assert!(problem.is_mip());
    }

    #[test]
    fn test_add_row() {
        let mut problem = Problem::new("test");
        let x = problem.column_entry("x");
        let row = problem.add_row("c1".into(), f64::NEG_INFINITY, 4.0);
        problem.row_mut(row).terms.push((x, 1.0));

        assert_eq!(problem.num_rows(), 1);
        let row = &problem.rows()[0];
        assert_eq!(row.name, "c1");
        assert_eq!(row.terms, [(x, 1.0)]);
    }
}
