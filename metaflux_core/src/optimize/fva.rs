//! Flux variability analysis
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::metabolic_model::model::Model;
use crate::optimize::fba::{build_problem, solve_problem};
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::solvers::Solver;
use crate::optimize::OptimizeError;
use crate::utils::numeric::round4;

/// Id of the constraint holding the objective near its optimum
const OBJECTIVE_FLOOR: &str = "__objective_floor__";

/// Feasible flux range of a reaction
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FluxRange {
    pub minimum: f64,
    pub maximum: f64,
}

/// Minimum and maximum flux of each reaction while the objective stays at or above
/// `fraction_of_optimum` times its optimum
///
/// Values are rounded to four decimal places. A reaction whose min or max solve fails is
/// reported as 0 for that side.
pub fn flux_variability(
    model: &Model,
    solver: &dyn Solver,
    reaction_ids: &[String],
    fraction_of_optimum: f64,
) -> Result<IndexMap<String, FluxRange>, OptimizeError> {
    if let Some(missing) = reaction_ids
        .iter()
        .find(|id| !model.reactions.contains_key(id.as_str()))
    {
        return Err(OptimizeError::ReactionNotFound(missing.clone()));
    }
    if model.objective.is_empty() {
        return Err(OptimizeError::MissingObjective);
    }

    let mut problem = build_problem(model, ObjectiveSense::Maximize)?;
    let optimum = solve_problem(model, &problem, solver)?;
    if !optimum.is_optimal() {
        return Err(OptimizeError::NonOptimal(optimum.status));
    }

    let (objective_ids, objective_coefs): (Vec<&str>, Vec<f64>) = model
        .objective
        .iter()
        .map(|(id, coef)| (id.as_str(), *coef))
        .unzip();
    problem.add_new_inequality_constraint_by_id(
        OBJECTIVE_FLOOR,
        &objective_ids,
        &objective_coefs,
        fraction_of_optimum * optimum.objective_value,
        f64::INFINITY,
    )?;

    let mut ranges = IndexMap::new();
    for reaction_id in reaction_ids {
        problem.remove_all_objective_terms();
        problem.add_new_linear_objective_term_by_id(reaction_id, 1.0)?;
        let mut extremes = [0.0; 2];
        for (slot, sense) in [ObjectiveSense::Minimize, ObjectiveSense::Maximize]
            .into_iter()
            .enumerate()
        {
            problem.update_objective_sense(sense);
            let solution = solve_problem(model, &problem, solver)?;
            if solution.is_optimal() {
                extremes[slot] = round4(solution.flux(reaction_id));
            } else {
                log::warn!(
                    "FVA {:?} of {} ended with status {}",
                    sense,
                    reaction_id,
                    solution.status
                );
            }
        }
        ranges.insert(
            reaction_id.clone(),
            FluxRange {
                minimum: extremes[0],
                maximum: extremes[1],
            },
        );
    }
    Ok(ranges)
}
