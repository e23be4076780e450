//! Minimization of metabolic adjustment (MOMA)
//!
//! Finds the flux distribution of a perturbed model closest to a reference distribution,
//! usually the wild type optimum.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::metabolic_model::model::Model;
use crate::optimize::fba::{build_problem, solve_problem, FluxSolution};
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::solvers::Solver;
use crate::optimize::OptimizeError;

/// Distance between the adjusted and reference flux vectors
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Sum of squared differences, needs a solver with quadratic objectives
    Euclidean,
    /// Sum of absolute differences, solvable as an LP
    Manhattan,
}

/// Result of a MOMA solve
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MomaSolution {
    pub metric: DistanceMetric,
    /// Adjusted fluxes, status is the status of the distance minimization
    pub solution: FluxSolution,
    /// Distance to the reference in the chosen metric (the root for euclidean)
    pub distance: f64,
}

/// Prefix of the auxiliary deviation variables of the manhattan formulation
const DEVIATION_PREFIX: &str = "__deviation__";

/// Solve MOMA for `model` against `reference` (reaction id to flux)
///
/// Reactions missing from the reference are left free. Euclidean distance is used when the
/// solver supports quadratic objectives, otherwise manhattan distance.
pub fn moma(
    model: &Model,
    reference: &IndexMap<String, f64>,
    solver: &dyn Solver,
) -> Result<MomaSolution, OptimizeError> {
    let mut problem = build_problem(model, ObjectiveSense::Minimize)?;
    problem.remove_all_objective_terms();
    let compared: Vec<(&String, f64)> = model
        .reactions
        .keys()
        .filter_map(|id| reference.get(id).map(|v| (id, *v)))
        .collect();

    let metric = if solver.quadratic_objective_capable() {
        for (id, ref_flux) in &compared {
            problem.add_new_quadratic_objective_term_by_id(id, id, 1.0)?;
            problem.add_new_linear_objective_term_by_id(id, -2.0 * ref_flux)?;
        }
        DistanceMetric::Euclidean
    } else {
        for (id, ref_flux) in &compared {
            let deviation = format!("{}{}", DEVIATION_PREFIX, id);
            problem.add_new_variable(&deviation, None, 0.0, f64::INFINITY)?;
            problem.add_new_inequality_constraint_by_id(
                &format!("{}upper_{}", DEVIATION_PREFIX, id),
                &[id.as_str(), deviation.as_str()],
                &[1.0, -1.0],
                f64::NEG_INFINITY,
                *ref_flux,
            )?;
            problem.add_new_inequality_constraint_by_id(
                &format!("{}lower_{}", DEVIATION_PREFIX, id),
                &[id.as_str(), deviation.as_str()],
                &[1.0, 1.0],
                *ref_flux,
                f64::INFINITY,
            )?;
            problem.add_new_linear_objective_term_by_id(&deviation, 1.0)?;
        }
        DistanceMetric::Manhattan
    };

    let mut solution = solve_problem(model, &problem, solver)?;
    let diffs = compared
        .iter()
        .map(|(id, ref_flux)| solution.flux(id) - ref_flux);
    let distance = match metric {
        DistanceMetric::Euclidean => diffs.map(|d| d * d).sum::<f64>().sqrt(),
        DistanceMetric::Manhattan => diffs.map(f64::abs).sum(),
    };
    // The solve objective is the distance, report growth instead
    solution.objective_value = model
        .objective
        .iter()
        .map(|(id, coef)| coef * solution.flux(id))
        .sum();
    // Mass balance duals of the distance problem are not shadow prices of growth
    solution.shadow_prices = None;
    Ok(MomaSolution {
        metric,
        solution,
        distance,
    })
}
