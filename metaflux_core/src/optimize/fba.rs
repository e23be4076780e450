//! Flux balance analysis: build the steady state problem of a model and optimize it
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::metabolic_model::model::Model;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::Solver;
use crate::optimize::{OptimizationStatus, OptimizeError};

/// Result of a single optimization of a metabolic model
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FluxSolution {
    pub status: OptimizationStatus,
    /// Objective value, 0 when the solve was not successful
    pub objective_value: f64,
    /// Reaction id to flux, empty when the solve was not successful
    pub fluxes: IndexMap<String, f64>,
    /// Metabolite id to shadow price, when the solver reports dual values
    pub shadow_prices: Option<IndexMap<String, f64>>,
}

impl FluxSolution {
    /// Flux of a reaction, 0 when absent
    pub fn flux(&self, reaction_id: &str) -> f64 {
        self.fluxes.get(reaction_id).copied().unwrap_or(0.0)
    }

    pub fn is_optimal(&self) -> bool {
        self.status.is_optimal()
    }
}

/// Ids of every metabolite taking part in a reaction, model metabolites first
fn balanced_metabolites(model: &Model) -> IndexSet<&str> {
    let mut ids: IndexSet<&str> = IndexSet::new();
    for id in model.metabolites.keys() {
        ids.insert(id.as_str());
    }
    for reaction in model.reactions.values() {
        for id in reaction.metabolites.keys() {
            ids.insert(id.as_str());
        }
    }
    ids
}

/// Build the steady state problem of a model
///
/// One variable per reaction (inactive reactions are pinned to zero) and one mass balance
/// equality per metabolite, keyed by the metabolite id. The model objective becomes the linear
/// objective of the problem.
pub fn build_problem(model: &Model, sense: ObjectiveSense) -> Result<Problem, OptimizeError> {
    let mut problem = Problem::new(sense);
    for reaction in model.reactions.values() {
        problem.add_new_variable(
            &reaction.id,
            reaction.name.as_deref(),
            reaction.effective_lower_bound(),
            reaction.effective_upper_bound(),
        )?;
    }

    let mut balances: IndexMap<&str, (Vec<&str>, Vec<f64>)> = balanced_metabolites(model)
        .into_iter()
        .map(|id| (id, (Vec::new(), Vec::new())))
        .collect();
    for reaction in model.reactions.values() {
        for (met_id, coef) in &reaction.metabolites {
            if let Some((vars, coefs)) = balances.get_mut(met_id.as_str()) {
                vars.push(reaction.id.as_str());
                coefs.push(*coef);
            }
        }
    }
    for (met_id, (vars, coefs)) in balances {
        problem.add_new_equality_constraint_by_id(met_id, &vars, &coefs, 0.0)?;
    }

    for (reaction_id, coef) in &model.objective {
        problem
            .add_new_linear_objective_term_by_id(reaction_id, *coef)
            .map_err(|_| OptimizeError::ReactionNotFound(reaction_id.clone()))?;
    }
    Ok(problem)
}

/// Convert the raw problem solution into a [`FluxSolution`]
pub(crate) fn solve_problem(
    model: &Model,
    problem: &Problem,
    solver: &dyn Solver,
) -> Result<FluxSolution, OptimizeError> {
    let solution = solver.solve(problem)?;
    if !solution.status.is_optimal() {
        return Ok(FluxSolution {
            status: solution.status,
            objective_value: 0.0,
            fluxes: IndexMap::new(),
            shadow_prices: None,
        });
    }
    let values = solution.variable_values.unwrap_or_default();
    let fluxes: IndexMap<String, f64> = model
        .reactions
        .keys()
        .map(|id| (id.clone(), values.get(id).copied().unwrap_or(0.0)))
        .collect();
    Ok(FluxSolution {
        status: solution.status,
        objective_value: solution.objective_value.unwrap_or(0.0),
        fluxes,
        shadow_prices: solution.dual_values,
    })
}

/// Maximize the model objective
///
/// A non-optimal outcome is not an error, it is reported through the returned status.
pub fn optimize(model: &Model, solver: &dyn Solver) -> Result<FluxSolution, OptimizeError> {
    if model.objective.is_empty() {
        return Err(OptimizeError::MissingObjective);
    }
    let problem = build_problem(model, ObjectiveSense::Maximize)?;
    solve_problem(model, &problem, solver)
}
