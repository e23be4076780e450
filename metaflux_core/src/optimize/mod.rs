//! Module for constructing and solving optimization problems

pub mod constraint;
pub mod envelope;
pub mod fba;
pub mod fva;
pub mod moma;
pub mod objective;
pub mod problem;
pub mod solvers;
pub mod variable;

use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::optimize::problem::ProblemError;
use crate::optimize::solvers::SolverError;

/// Struct representing the solution to an optimization problem
#[derive(Debug, Clone)]
pub struct ProblemSolution {
    /// The status of the optimization problem, representing if the optimization was
    /// completed successfully
    pub status: OptimizationStatus,
    /// Optimized value of the objective
    ///
    /// Some(f64) if the optimization was completed successfully, None otherwise
    pub objective_value: Option<f64>,
    /// Values of the variables at the optimum,
    ///
    /// Some(IndexMap), keyed by variable id, with values corresponding to variable
    /// values at optimum if the problem could be solved, None otherwise
    pub variable_values: Option<IndexMap<String, f64>>,
    /// Values of the dual variables of the equality constraints at the optimum
    ///
    /// Keyed by constraint id, expressed as the change in objective per unit increase of the
    /// constraint's right hand side. None when the solver doesn't provide dual values.
    pub dual_values: Option<IndexMap<String, f64>>,
}

impl ProblemSolution {
    /// A solution carrying only a (non-optimal) status
    pub fn from_status(status: OptimizationStatus) -> Self {
        ProblemSolution {
            status,
            objective_value: None,
            variable_values: None,
            dual_values: None,
        }
    }
}

/// Status of an optimization problem
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationStatus {
    /// Problem has been optimized
    Optimal,
    /// An approximate solution has been found
    AlmostOptimal,
    /// Problem can't be optimized because objective value is not bounded
    Unbounded,
    /// Problem can't be solved because it is infeasible (conflicting constraints)
    Infeasible,
    /// A numerical error occurred during solving
    NumericalError,
    /// The solver hit the maximum allowed iterations, or max time, or made insufficient progress
    SolverHalted,
}

impl OptimizationStatus {
    /// Whether the variable values can be trusted
    pub fn is_optimal(&self) -> bool {
        matches!(
            self,
            OptimizationStatus::Optimal | OptimizationStatus::AlmostOptimal
        )
    }
}

impl Display for OptimizationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            OptimizationStatus::Optimal => "optimal",
            OptimizationStatus::AlmostOptimal => "almost optimal",
            OptimizationStatus::Unbounded => "unbounded",
            OptimizationStatus::Infeasible => "infeasible",
            OptimizationStatus::NumericalError => "numerical error",
            OptimizationStatus::SolverHalted => "solver halted",
        };
        write!(f, "{}", text)
    }
}

/// Errors raised by the model level analyses (FBA, FVA, MOMA, envelopes)
#[derive(Error, Debug)]
pub enum OptimizeError {
    #[error("Unable to construct the optimization problem: {0}")]
    Problem(#[from] ProblemError),
    #[error("Solver failure: {0}")]
    Solver(#[from] SolverError),
    #[error("Reaction {0} not found in the model")]
    ReactionNotFound(String),
    #[error("Model has no objective")]
    MissingObjective,
    #[error("Optimization was not successful, status: {0}")]
    NonOptimal(OptimizationStatus),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display() {
        assert_eq!(OptimizationStatus::Optimal.to_string(), "optimal");
        assert_eq!(OptimizationStatus::Infeasible.to_string(), "infeasible");
        assert_eq!(OptimizationStatus::SolverHalted.to_string(), "solver halted");
        assert!(OptimizationStatus::AlmostOptimal.is_optimal());
        assert!(!OptimizationStatus::Unbounded.is_optimal());
    }
}
