//! Code for configuring and running the HiGHS solver.
//!
//! The [`Algorithm`] letters mirror the experiment scripts' command-line
//! interface; each maps onto a HiGHS option set. Solving converts a
//! [`Problem`] into a [`highs::RowProblem`], columns first and in model
//! order, so that the solver's solution vectors can be zipped straight back
//! against the model.
use crate::problem::{Column, ObjectiveSense, Problem};
use anyhow::{Result, anyhow};
use clap::ValueEnum;
use derive_more::Display;
use highs::{HighsModelStatus, RowProblem, Sense};
use indexmap::IndexMap;
use log::debug;
use strum::EnumIter;

/// The solution algorithm, chosen by a one-letter code on the command line.
#[derive(Clone, Copy, Debug, Display, EnumIter, PartialEq, Eq, ValueEnum)]
pub enum Algorithm {
    /// Let the solver choose
    #[value(name = "o")]
    #[display("automatic")]
    Automatic,
    /// Primal simplex
    #[value(name = "p")]
    #[display("primal simplex")]
    PrimalSimplex,
    /// Dual simplex
    #[value(name = "d")]
    #[display("dual simplex")]
    DualSimplex,
    /// Interior point without crossover
    #[value(name = "b")]
    #[display("barrier")]
    Barrier,
    /// Interior point with crossover to a basic solution
    #[value(name = "h")]
    #[display("barrier with crossover")]
    BarrierCrossover,
    /// First-order method (PDLP)
    #[value(name = "s")]
    #[display("first-order (PDLP)")]
    FirstOrder,
    /// Concurrent solve with parallelism enabled
    #[value(name = "c")]
    #[display("concurrent")]
    Concurrent,
}

/// Options controlling a solve.
#[derive(Clone, Copy, Debug)]
pub struct SolveOptions {
    /// Whether the solver's own console output is shown
    pub solver_output: bool,
    /// Tolerance used for classifying columns and measuring violations
    pub feasibility_tolerance: f64,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            solver_output: false,
            feasibility_tolerance: 1e-7,
        }
    }
}

/// Basis-style classification of a column in an optimal solution.
///
/// The underlying solver bindings do not expose the simplex basis, so the
/// classification is derived from the column's value, bounds and reduced
/// cost.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum ColumnStatus {
    /// Nonbasic at its lower bound
    #[display("nonbasic at lower bound")]
    AtLowerBound,
    /// In the basis
    #[display("basic")]
    Basic,
    /// Nonbasic at its upper bound
    #[display("nonbasic at upper bound")]
    AtUpperBound,
    /// Superbasic, or a free column at zero
    #[display("superbasic, or free at zero")]
    Superbasic,
}

/// The reported value of a single column.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnReport {
    /// Name of the column
    pub name: String,
    /// Value of the column in the solution
    pub value: f64,
    /// Basis-style classification; absent for MIP solves, which have no basis
    pub status: Option<ColumnStatus>,
}

/// The report built from an optimal solution.
#[derive(Debug)]
pub struct SolveReport {
    /// The objective value, including any constant offset
    pub objective: f64,
    /// Per-column values, in model order
    pub columns: Vec<ColumnReport>,
    /// The largest violation of any column or row bound
    pub max_bound_violation: f64,
}

/// A terminal solve outcome.
#[derive(Debug)]
pub enum SolveOutcome {
    /// An optimal solution was found
    Optimal(SolveReport),
    /// The problem has no feasible solution
    Infeasible,
    /// The objective is unbounded
    Unbounded,
    /// The solver could not distinguish infeasibility from unboundedness
    InfeasibleOrUnbounded,
}

/// Solve `problem` with the given algorithm.
///
/// # Returns
///
/// A terminal [`SolveOutcome`], or an error for any other solver status
/// (model errors, interrupted solves and the like).
pub fn solve(
    problem: &Problem,
    algorithm: Algorithm,
    options: &SolveOptions,
) -> Result<SolveOutcome> {
    let sense = match problem.sense {
        ObjectiveSense::Minimise => Sense::Minimise,
        ObjectiveSense::Maximise => Sense::Maximise,
    };

    let mut model = build_highs_problem(problem).optimise(sense);
    model.set_option("output_flag", options.solver_output);
    apply_algorithm(&mut model, algorithm);

    debug!(
        "Solving '{}' with the {} algorithm ({} columns, {} rows)",
        problem.name,
        algorithm,
        problem.num_columns(),
        problem.num_rows()
    );

    let solved = model.solve();
    match solved.status() {
        HighsModelStatus::Optimal => Ok(SolveOutcome::Optimal(build_report(
            problem,
            &solved.get_solution(),
            options,
        ))),
        HighsModelStatus::Infeasible => Ok(SolveOutcome::Infeasible),
        HighsModelStatus::Unbounded => Ok(SolveOutcome::Unbounded),
        HighsModelStatus::UnboundedOrInfeasible => Ok(SolveOutcome::InfeasibleOrUnbounded),
        status => Err(anyhow!("Could not solve: {status:?}")),
    }
}

/// Convert a [`Problem`] into a HiGHS row problem
fn build_highs_problem(problem: &Problem) -> RowProblem {
    let mut out = RowProblem::default();

    let columns: Vec<highs::Col> = problem
        .columns()
        .map(|(_, column)| add_highs_column(&mut out, column))
        .collect();

    for row in problem.rows() {
        // Merge repeated terms; the solver expects each column at most once
        let mut terms: IndexMap<usize, f64> = IndexMap::new();
        for &(column, coefficient) in &row.terms {
            *terms.entry(column).or_insert(0.0) += coefficient;
        }

        out.add_row(
            row.lower..=row.upper,
            terms
                .into_iter()
                .map(|(column, coefficient)| (columns[column], coefficient)),
        );
    }

    out
}

fn add_highs_column(out: &mut RowProblem, column: &Column) -> highs::Col {
    if column.is_integer {
        out.add_integer_column(column.cost, column.lower..=column.upper)
    } else {
        out.add_column(column.cost, column.lower..=column.upper)
    }
}

/// Apply the option set for the chosen algorithm
fn apply_algorithm(model: &mut highs::Model, algorithm: Algorithm) {
    match algorithm {
        Algorithm::Automatic => {
            model.set_option("solver", "choose");
        }
        Algorithm::PrimalSimplex => {
            model.set_option("solver", "simplex");
            model.set_option("simplex_strategy", 4);
        }
        Algorithm::DualSimplex => {
            model.set_option("solver", "simplex");
            model.set_option("simplex_strategy", 1);
        }
        Algorithm::Barrier => {
            model.set_option("solver", "ipm");
            model.set_option("run_crossover", "off");
        }
        Algorithm::BarrierCrossover => {
            model.set_option("solver", "ipm");
            model.set_option("run_crossover", "on");
        }
        Algorithm::FirstOrder => {
            model.set_option("solver", "pdlp");
        }
        Algorithm::Concurrent => {
            model.set_option("solver", "choose");
            model.set_option("parallel", "on");
        }
    }
}

/// Build the solution report for an optimal solve
fn build_report(problem: &Problem, solution: &highs::Solution, options: &SolveOptions) -> SolveReport {
    let values = solution.columns();
    let reduced_costs = solution.dual_columns();
    let is_mip = problem.is_mip();
    let tolerance = options.feasibility_tolerance;

    let mut objective = problem.objective_offset;
    let mut max_violation = 0.0_f64;
    let mut columns = Vec::with_capacity(problem.num_columns());

    for (index, ((name, column), &value)) in problem.columns().zip(values).enumerate() {
        objective += column.cost * value;
        max_violation = max_violation
            .max(column.lower - value)
            .max(value - column.upper);

        // MIP solutions carry no duals, hence no classification
        let status = match reduced_costs.get(index) {
            Some(&reduced_cost) if !is_mip => {
                Some(classify_column(column, value, reduced_cost, tolerance))
            }
            _ => None,
        };

        columns.push(ColumnReport {
            name: name.to_string(),
            value,
            status,
        });
    }

    for (row, &activity) in problem.rows().iter().zip(solution.rows()) {
        max_violation = max_violation
            .max(row.lower - activity)
            .max(activity - row.upper);
    }

    SolveReport {
        objective,
        columns,
        max_bound_violation: max_violation.max(0.0),
    }
}

/// Classify a column from its value, bounds and reduced cost.
///
/// A column with a reduced cost within tolerance of zero is taken to be
/// basic; otherwise it is held at whichever bound its value sits on, or is
/// superbasic if it sits on neither.
fn classify_column(column: &Column, value: f64, reduced_cost: f64, tolerance: f64) -> ColumnStatus {
    if reduced_cost.abs() <= tolerance {
        return ColumnStatus::Basic;
    }

    if column.lower.is_finite() && (value - column.lower).abs() <= tolerance {
        ColumnStatus::AtLowerBound
    } else if column.upper.is_finite() && (value - column.upper).abs() <= tolerance {
        ColumnStatus::AtUpperBound
    } else {
        ColumnStatus::Superbasic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{knapsack_problem, production_problem};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    fn quiet() -> SolveOptions {
        SolveOptions::default()
    }

    #[rstest]
    fn test_solve_production_with_every_algorithm(production_problem: Problem) {
        for algorithm in Algorithm::iter() {
            let outcome = solve(&production_problem, algorithm, &quiet()).unwrap();
            let SolveOutcome::Optimal(report) = outcome else {
                panic!("expected an optimal outcome for {algorithm}");
            };

            // Optimum is x = 2, y = 6 with objective 36
            assert_approx_eq!(f64, report.objective, 36.0, epsilon = 1e-3);
            assert_approx_eq!(f64, report.columns[0].value, 2.0, epsilon = 1e-3);
            assert_approx_eq!(f64, report.columns[1].value, 6.0, epsilon = 1e-3);
            assert!(report.max_bound_violation < 1e-3);
        }
    }

    #[rstest]
    fn test_solve_knapsack(knapsack_problem: Problem) {
        let outcome = solve(&knapsack_problem, Algorithm::Automatic, &quiet()).unwrap();
        let SolveOutcome::Optimal(report) = outcome else {
            panic!("expected an optimal outcome");
        };

        assert_approx_eq!(f64, report.objective, 14.0, epsilon = 1e-6);
        // No basis classification for a MIP solve
        assert!(report.columns.iter().all(|column| column.status.is_none()));
    }

    #[rstest]
    fn test_solve_infeasible(mut production_problem: Problem) {
        let x = production_problem.column_index("x").unwrap();
        production_problem.column_mut(x).lower = 100.0;

        let outcome = solve(&production_problem, Algorithm::DualSimplex, &quiet()).unwrap();
        assert!(matches!(outcome, SolveOutcome::Infeasible));
    }

    #[test]
    fn test_solve_unbounded() {
        let mut problem = Problem::new("unbounded");
        problem.sense = ObjectiveSense::Maximise;
        let x = problem.column_entry("x");
        problem.column_mut(x).cost = 1.0;

        let outcome = solve(&problem, Algorithm::PrimalSimplex, &quiet()).unwrap();
        assert!(matches!(
            outcome,
            SolveOutcome::Unbounded | SolveOutcome::InfeasibleOrUnbounded
        ));
    }

    #[rstest]
    fn test_objective_offset_is_reported(mut production_problem: Problem) {
        production_problem.objective_offset = 10.0;

        let SolveOutcome::Optimal(report) =
            solve(&production_problem, Algorithm::DualSimplex, &quiet()).unwrap()
        else {
            panic!("expected an optimal outcome");
        };
        assert_approx_eq!(f64, report.objective, 46.0, epsilon = 1e-6);
    }

    #[rstest]
    #[case(0.0, 0.0, 10.0, 0.5, ColumnStatus::AtLowerBound)]
    #[case(10.0, 0.0, 10.0, -0.5, ColumnStatus::AtUpperBound)]
    #[case(4.0, 0.0, 10.0, 0.0, ColumnStatus::Basic)]
    #[case(0.0, f64::NEG_INFINITY, f64::INFINITY, 0.5, ColumnStatus::Superbasic)]
    #[case(0.0, 0.0, 10.0, 1e-9, ColumnStatus::Basic)]
    fn test_classify_column(
        #[case] value: f64,
        #[case] lower: f64,
        #[case] upper: f64,
        #[case] reduced_cost: f64,
        #[case] expected: ColumnStatus,
    ) {
        let column = Column {
            cost: 1.0,
            lower,
            upper,
            is_integer: false,
        };
        assert_eq!(
            classify_column(&column, value, reduced_cost, 1e-7),
            expected
        );
    }
}
