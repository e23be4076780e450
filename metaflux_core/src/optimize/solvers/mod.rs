//! Solver back ends used to optimize a [`Problem`]
#[cfg(feature = "minilp")]
pub mod microlp;

pub mod clarabel;

use thiserror::Error;

use crate::configuration::{solver_kind, SolverKind};
use crate::optimize::problem::Problem;
use crate::optimize::ProblemSolution;

/// An optimization back end
///
/// Solvers are stateless, each call builds the back end's own representation of the
/// problem from scratch.
pub trait Solver: Send + Sync {
    /// Optimize the problem
    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError>;

    /// Whether the solver can handle quadratic objective terms
    fn quadratic_objective_capable(&self) -> bool;

    /// Whether dual values are reported for equality constraints
    fn dual_values_capable(&self) -> bool {
        false
    }

    /// Short name of the back end, used in log messages
    fn name(&self) -> &'static str;
}

/// Create the solver selected in [`crate::configuration::CONFIGURATION`]
pub fn from_configuration() -> Box<dyn Solver> {
    match solver_kind() {
        SolverKind::Clarabel => Box::new(clarabel::ClarabelSolver::default()),
        SolverKind::Microlp => microlp_or_default(),
    }
}

#[cfg(feature = "minilp")]
fn microlp_or_default() -> Box<dyn Solver> {
    Box::new(microlp::MicrolpSolver)
}

#[cfg(not(feature = "minilp"))]
fn microlp_or_default() -> Box<dyn Solver> {
    log::warn!("microlp requested but the minilp feature is disabled, using Clarabel");
    Box::new(clarabel::ClarabelSolver::default())
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// The problem includes quadratic objective terms the solver can't handle
    #[error("Solver {0} does not support quadratic objectives")]
    QuadraticUnsupported(&'static str),
    /// The back end rejected the problem or failed while solving
    #[error("Solver back end failure: {0}")]
    Backend(String),
}
