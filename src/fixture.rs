//! Fixtures for tests

use crate::problem::{ObjectiveSense, Problem};
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A two-variable production-planning LP with optimum (2, 6) and objective 36
#[fixture]
pub fn production_problem() -> Problem {
    let mut problem = Problem::new("production");
    problem.sense = ObjectiveSense::Maximise;

    let x = problem.column_entry("x");
    problem.column_mut(x).cost = 3.0;
    let y = problem.column_entry("y");
    problem.column_mut(y).cost = 5.0;

    let c1 = problem.add_row("c1".into(), f64::NEG_INFINITY, 4.0);
    problem.row_mut(c1).terms.push((x, 1.0));
    let c2 = problem.add_row("c2".into(), f64::NEG_INFINITY, 12.0);
    problem.row_mut(c2).terms.push((y, 2.0));
    let c3 = problem.add_row("c3".into(), f64::NEG_INFINITY, 18.0);
    problem.row_mut(c3).terms.extend([(x, 3.0), (y, 2.0)]);

    problem
}

/// A three-item 0/1 knapsack with optimal value 14 (items 1 and 3)
#[fixture]
pub fn knapsack_problem() -> Problem {
    let mut problem = Problem::new("knapsack");
    problem.sense = ObjectiveSense::Maximise;

    let weight = problem.add_row("weight".into(), f64::NEG_INFINITY, 10.0);
    for (name, value, item_weight) in [
        ("take1", 10.0, 6.0),
        ("take2", 6.0, 5.0),
        ("take3", 4.0, 4.0),
    ] {
        let index = problem.column_entry(name);
        let column = problem.column_mut(index);
        column.cost = value;
        column.upper = 1.0;
        column.is_integer = true;
        problem.row_mut(weight).terms.push((index, item_weight));
    }

    problem
}
