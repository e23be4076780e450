//! Implements a solver interface for microlp, a pure rust simplex solver
//!
//! Only linear objectives are supported and no dual values are reported.
use ::microlp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem as LpProblem};
use indexmap::IndexMap;

use crate::optimize::constraint::Constraint;
use crate::optimize::objective::{ObjectiveSense, ObjectiveTerm};
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::{OptimizationStatus, ProblemSolution};

#[derive(Clone, Copy, Debug, Default)]
pub struct MicrolpSolver;

impl Solver for MicrolpSolver {
    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError> {
        if problem.has_quadratic_objective_terms() {
            return Err(SolverError::QuadraticUnsupported(self.name()));
        }
        let direction = match problem.objective().sense() {
            ObjectiveSense::Maximize => OptimizationDirection::Maximize,
            ObjectiveSense::Minimize => OptimizationDirection::Minimize,
        };
        let mut objective = vec![0.0; problem.num_variables()];
        for term in problem.objective().terms() {
            if let ObjectiveTerm::Linear { var, coef } = term {
                objective[*var] += coef;
            }
        }

        let mut lp = LpProblem::new(direction);
        let vars: Vec<_> = problem
            .variables()
            .values()
            .map(|v| lp.add_var(objective[v.index()], (v.lower_bound, v.upper_bound)))
            .collect();

        for constraint in problem.constraints().values() {
            let mut expr = LinearExpr::empty();
            for term in constraint.terms() {
                expr.add(vars[term.index], term.coefficient);
            }
            match constraint {
                Constraint::Equality { equals, .. } => {
                    lp.add_constraint(expr, ComparisonOp::Eq, *equals)
                }
                Constraint::Inequality {
                    lower_bound,
                    upper_bound,
                    ..
                } => {
                    if upper_bound.is_finite() {
                        lp.add_constraint(expr.clone(), ComparisonOp::Le, *upper_bound);
                    }
                    if lower_bound.is_finite() {
                        lp.add_constraint(expr, ComparisonOp::Ge, *lower_bound);
                    }
                }
            }
        }

        match lp.solve() {
            Ok(solution) => {
                let values: Vec<f64> = vars.iter().map(|var| solution[*var]).collect();
                let variable_values: IndexMap<String, f64> = problem
                    .variables()
                    .values()
                    .map(|v| (v.id.clone(), values[v.index()]))
                    .collect();
                Ok(ProblemSolution {
                    status: OptimizationStatus::Optimal,
                    objective_value: Some(problem.objective().evaluate(&values)),
                    variable_values: Some(variable_values),
                    dual_values: None,
                })
            }
            Err(::microlp::Error::Infeasible) => {
                Ok(ProblemSolution::from_status(OptimizationStatus::Infeasible))
            }
            Err(::microlp::Error::Unbounded) => {
                Ok(ProblemSolution::from_status(OptimizationStatus::Unbounded))
            }
            Err(err) => Err(SolverError::Backend(err.to_string())),
        }
    }

    fn quadratic_objective_capable(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "microlp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_lp() {
        let mut problem = Problem::new_maximization();
        problem.add_new_variable("x", None, 0., 3.).unwrap();
        problem.add_new_variable("y", None, 0., f64::INFINITY).unwrap();
        problem
            .add_new_inequality_constraint_by_id("c", &["x", "y"], &[1., 2.], f64::NEG_INFINITY, 4.)
            .unwrap();
        problem.add_new_linear_objective_term_by_id("x", 1.).unwrap();
        problem.add_new_linear_objective_term_by_id("y", 1.).unwrap();
        let solution = MicrolpSolver.solve(&problem).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert!((solution.objective_value.unwrap() - 3.5).abs() < 1e-8);
        assert!(solution.dual_values.is_none());
    }

    #[test]
    fn quadratic_rejected() {
        let mut problem = Problem::new_minimization();
        problem.add_new_variable("x", None, 0., 3.).unwrap();
        problem.add_new_quadratic_objective_term_by_id("x", "x", 1.).unwrap();
        assert_eq!(
            MicrolpSolver.solve(&problem).unwrap_err(),
            SolverError::QuadraticUnsupported("microlp")
        );
    }
}
