//! Implements a solver interface for Clarabel
//!
//! Clarabel solves `min 1/2 x'Px + q'x  s.t.  Ax + s = b, s in K`. Equality constraints and
//! fixed variables go into the zero cone, every finite inequality bound becomes one row of the
//! nonnegative cone.
use ::clarabel::algebra::CscMatrix as ClarabelCsc;
use ::clarabel::solver::{
    DefaultSettings, DefaultSolver, IPSolver, NonnegativeConeT, SolverStatus, SupportedConeT,
    ZeroConeT,
};
use indexmap::IndexMap;
use nalgebra_sparse::{CooMatrix, CscMatrix};

use crate::optimize::constraint::Constraint;
use crate::optimize::objective::{ObjectiveSense, ObjectiveTerm};
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// Interior point solver, supports quadratic objectives and reports dual values
#[derive(Clone, Debug)]
pub struct ClarabelSolver {
    /// Maximum number of interior point iterations
    pub max_iter: u32,
}

impl Default for ClarabelSolver {
    fn default() -> Self {
        ClarabelSolver { max_iter: 200 }
    }
}

/// One row of the constraint matrix, before being split into cones
struct Row {
    terms: Vec<(usize, f64)>,
    rhs: f64,
}

/// Rows grouped by the cone they belong to, zero cone rows come first
#[derive(Default)]
struct ConeRows {
    zero: Vec<Row>,
    /// Keys of equality constraints and the row they occupy in the zero cone
    equality_ids: Vec<(String, usize)>,
    nonnegative: Vec<Row>,
}

impl ConeRows {
    fn from_problem(problem: &Problem) -> ConeRows {
        let mut rows = ConeRows::default();
        for (id, constraint) in problem.constraints() {
            let terms: Vec<(usize, f64)> = constraint
                .terms()
                .iter()
                .map(|t| (t.index, t.coefficient))
                .collect();
            match constraint {
                Constraint::Equality { equals, .. } => {
                    rows.equality_ids.push((id.clone(), rows.zero.len()));
                    rows.zero.push(Row {
                        terms,
                        rhs: *equals,
                    });
                }
                Constraint::Inequality {
                    lower_bound,
                    upper_bound,
                    ..
                } => rows.push_bounds(&terms, *lower_bound, *upper_bound),
            }
        }
        for variable in problem.variables().values() {
            let terms = [(variable.index(), 1.0)];
            if variable.is_fixed() {
                rows.zero.push(Row {
                    terms: terms.to_vec(),
                    rhs: variable.lower_bound,
                });
            } else {
                rows.push_bounds(&terms, variable.lower_bound, variable.upper_bound);
            }
        }
        rows
    }

    /// `lb <= a'x <= ub` becomes `a'x + s = ub` and `-a'x + s = -lb`, infinite sides are skipped
    fn push_bounds(&mut self, terms: &[(usize, f64)], lower_bound: f64, upper_bound: f64) {
        if upper_bound.is_finite() {
            self.nonnegative.push(Row {
                terms: terms.to_vec(),
                rhs: upper_bound,
            });
        }
        if lower_bound.is_finite() {
            self.nonnegative.push(Row {
                terms: terms.iter().map(|(i, c)| (*i, -c)).collect(),
                rhs: -lower_bound,
            });
        }
    }
}

/// Convert a nalgebra-sparse CSC matrix into Clarabel's representation
fn to_clarabel(matrix: CscMatrix<f64>) -> ClarabelCsc<f64> {
    let (nrows, ncols) = (matrix.nrows(), matrix.ncols());
    let (colptr, rowval, nzval) = matrix.disassemble();
    ClarabelCsc::new(nrows, ncols, colptr, rowval, nzval)
}

impl ClarabelSolver {
    /// Build the objective as `(P, q)` in minimization form, P holds the upper triangle only
    fn objective_matrices(problem: &Problem) -> (ClarabelCsc<f64>, Vec<f64>) {
        let n = problem.num_variables();
        let sign = match problem.objective().sense() {
            ObjectiveSense::Minimize => 1.0,
            ObjectiveSense::Maximize => -1.0,
        };
        let mut q = vec![0.0; n];
        let mut p = CooMatrix::new(n, n);
        for term in problem.objective().terms() {
            match *term {
                ObjectiveTerm::Linear { var, coef } => q[var] += sign * coef,
                ObjectiveTerm::Quadratic { var1, var2, coef } => {
                    if var1 == var2 {
                        // 1/2 * P_ii * x_i^2 == coef * x_i^2
                        p.push(var1, var1, sign * 2.0 * coef);
                    } else {
                        p.push(var1.min(var2), var1.max(var2), sign * coef);
                    }
                }
            }
        }
        (to_clarabel(CscMatrix::from(&p)), q)
    }

    fn map_status(status: SolverStatus) -> OptimizationStatus {
        match status {
            SolverStatus::Solved => OptimizationStatus::Optimal,
            SolverStatus::AlmostSolved => OptimizationStatus::AlmostOptimal,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                OptimizationStatus::Infeasible
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                OptimizationStatus::Unbounded
            }
            SolverStatus::NumericalError => OptimizationStatus::NumericalError,
            _ => OptimizationStatus::SolverHalted,
        }
    }
}

impl Solver for ClarabelSolver {
    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError> {
        let n = problem.num_variables();
        let rows = ConeRows::from_problem(problem);
        let n_zero = rows.zero.len();
        let n_rows = n_zero + rows.nonnegative.len();

        let mut a = CooMatrix::new(n_rows, n);
        let mut b = Vec::with_capacity(n_rows);
        for (row_index, row) in rows.zero.iter().chain(rows.nonnegative.iter()).enumerate() {
            for (col, coef) in &row.terms {
                if *coef != 0.0 {
                    a.push(row_index, *col, *coef);
                }
            }
            b.push(row.rhs);
        }
        let a = to_clarabel(CscMatrix::from(&a));
        let (p, q) = ClarabelSolver::objective_matrices(problem);

        let mut cones: Vec<SupportedConeT<f64>> = Vec::new();
        if n_zero > 0 {
            cones.push(ZeroConeT(n_zero));
        }
        if !rows.nonnegative.is_empty() {
            cones.push(NonnegativeConeT(rows.nonnegative.len()));
        }

        let mut settings = DefaultSettings::<f64>::default();
        settings.verbose = false;
        settings.max_iter = self.max_iter;

        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings);
        solver.solve();

        let status = ClarabelSolver::map_status(solver.solution.status);
        log::debug!(
            "Clarabel finished with status {} ({} variables, {} rows)",
            status,
            n,
            n_rows
        );
        if !status.is_optimal() {
            return Ok(ProblemSolution::from_status(status));
        }

        let x = &solver.solution.x;
        if x.len() != n {
            return Err(SolverError::Backend(format!(
                "expected {} primal values, got {}",
                n,
                x.len()
            )));
        }
        let variable_values: IndexMap<String, f64> = problem
            .variables()
            .values()
            .map(|v| (v.id.clone(), x[v.index()]))
            .collect();

        // Dual of an equality row is the sensitivity of the minimized objective, negate it
        // back for minimization so the value always follows the problem's own sense
        let z = &solver.solution.z;
        let dual_sign = match problem.objective().sense() {
            ObjectiveSense::Maximize => 1.0,
            ObjectiveSense::Minimize => -1.0,
        };
        let dual_values: IndexMap<String, f64> = rows
            .equality_ids
            .iter()
            .map(|(id, row)| (id.clone(), dual_sign * z.get(*row).copied().unwrap_or(0.0)))
            .collect();

        Ok(ProblemSolution {
            status,
            objective_value: Some(problem.objective().evaluate(x)),
            variable_values: Some(variable_values),
            dual_values: Some(dual_values),
        })
    }

    fn quadratic_objective_capable(&self) -> bool {
        true
    }

    fn dual_values_capable(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "clarabel"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_lp() {
        // max x + y, x + 2y <= 4, 0 <= x <= 3, 0 <= y
        let mut problem = Problem::new_maximization();
        problem.add_new_variable("x", None, 0., 3.).unwrap();
        problem.add_new_variable("y", None, 0., f64::INFINITY).unwrap();
        problem
            .add_new_inequality_constraint_by_id("c", &["x", "y"], &[1., 2.], f64::NEG_INFINITY, 4.)
            .unwrap();
        problem.add_new_linear_objective_term_by_id("x", 1.).unwrap();
        problem.add_new_linear_objective_term_by_id("y", 1.).unwrap();

        let solution = ClarabelSolver::default().solve(&problem).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert!((solution.objective_value.unwrap() - 3.5).abs() < 1e-5);
        let values = solution.variable_values.unwrap();
        assert!((values["x"] - 3.).abs() < 1e-5);
        assert!((values["y"] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn equality_duals() {
        // max x, x - y = 0, 0 <= y <= 2: relaxing the equality by one lets x grow by one
        let mut problem = Problem::new_maximization();
        problem.add_new_variable("x", None, 0., 10.).unwrap();
        problem.add_new_variable("y", None, 0., 2.).unwrap();
        problem
            .add_new_equality_constraint_by_id("balance", &["x", "y"], &[1., -1.], 0.)
            .unwrap();
        problem.add_new_linear_objective_term_by_id("x", 1.).unwrap();
        let solution = ClarabelSolver::default().solve(&problem).unwrap();
        assert!((solution.objective_value.unwrap() - 2.).abs() < 1e-5);
        let duals = solution.dual_values.unwrap();
        assert!((duals["balance"] - 1.).abs() < 1e-4);
    }

    #[test]
    fn fixed_variables() {
        let mut problem = Problem::new_maximization();
        problem.add_new_variable("x", None, 0., 0.).unwrap();
        problem.add_new_variable("y", None, 0., 5.).unwrap();
        problem.add_new_linear_objective_term_by_id("x", 1.).unwrap();
        problem.add_new_linear_objective_term_by_id("y", 1.).unwrap();
        let solution = ClarabelSolver::default().solve(&problem).unwrap();
        let values = solution.variable_values.unwrap();
        assert!(values["x"].abs() < 1e-6);
        assert!((values["y"] - 5.).abs() < 1e-5);
    }

    #[test]
    fn quadratic_objective() {
        // min (x - 1)^2 + (y - 2)^2 == x^2 + y^2 - 2x - 4y + const, with x + y = 1
        let mut problem = Problem::new_minimization();
        problem.add_new_variable("x", None, -10., 10.).unwrap();
        problem.add_new_variable("y", None, -10., 10.).unwrap();
        problem
            .add_new_equality_constraint_by_id("sum", &["x", "y"], &[1., 1.], 1.)
            .unwrap();
        problem.add_new_quadratic_objective_term_by_id("x", "x", 1.).unwrap();
        problem.add_new_quadratic_objective_term_by_id("y", "y", 1.).unwrap();
        problem.add_new_linear_objective_term_by_id("x", -2.).unwrap();
        problem.add_new_linear_objective_term_by_id("y", -4.).unwrap();
        let solution = ClarabelSolver::default().solve(&problem).unwrap();
        let values = solution.variable_values.unwrap();
        assert!(values["x"].abs() < 1e-5);
        assert!((values["y"] - 1.).abs() < 1e-5);
    }

    #[test]
    fn infeasible() {
        let mut problem = Problem::new_maximization();
        problem.add_new_variable("x", None, 0., 1.).unwrap();
        problem
            .add_new_equality_constraint_by_id("impossible", &["x"], &[1.], 5.)
            .unwrap();
        problem.add_new_linear_objective_term_by_id("x", 1.).unwrap();
        let solution = ClarabelSolver::default().solve(&problem).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Infeasible);
        assert!(solution.variable_values.is_none());
    }
}
