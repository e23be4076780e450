//! Production envelope: range of a target flux across growth rates
use serde::{Deserialize, Serialize};

use crate::metabolic_model::model::Model;
use crate::optimize::fba::{build_problem, optimize, solve_problem};
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::solvers::Solver;
use crate::optimize::OptimizeError;
use crate::utils::numeric::round4;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvelopePoint {
    pub growth_rate: f64,
    pub min_flux: f64,
    pub max_flux: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductionEnvelope {
    pub target_reaction: String,
    pub data: Vec<EnvelopePoint>,
    /// Largest target flux seen anywhere on the envelope
    pub max_yield: f64,
}

/// Compute `points` evenly spaced growth levels from 0 to the maximal growth rate, and the
/// minimum and maximum target flux with growth fixed at each level
pub fn production_envelope(
    model: &Model,
    solver: &dyn Solver,
    target_reaction: &str,
    points: usize,
) -> Result<ProductionEnvelope, OptimizeError> {
    if !model.reactions.contains_key(target_reaction) {
        return Err(OptimizeError::ReactionNotFound(target_reaction.to_string()));
    }
    let biomass_id = model
        .objective_reaction_id()
        .ok_or(OptimizeError::MissingObjective)?
        .to_string();
    let optimum = optimize(model, solver)?;
    if !optimum.is_optimal() {
        return Err(OptimizeError::NonOptimal(optimum.status));
    }
    let max_growth = optimum.flux(&biomass_id).max(0.0);

    let mut problem = build_problem(model, ObjectiveSense::Maximize)?;
    problem.remove_all_objective_terms();
    problem.add_new_linear_objective_term_by_id(target_reaction, 1.0)?;

    let steps = points.max(2) - 1;
    let mut data = Vec::with_capacity(steps + 1);
    for step in 0..=steps {
        let growth = max_growth * step as f64 / steps as f64;
        problem.update_variable_bounds(&biomass_id, growth, growth)?;
        let mut extremes = [0.0; 2];
        for (slot, sense) in [ObjectiveSense::Minimize, ObjectiveSense::Maximize]
            .into_iter()
            .enumerate()
        {
            problem.update_objective_sense(sense);
            let solution = solve_problem(model, &problem, solver)?;
            if solution.is_optimal() {
                extremes[slot] = round4(solution.flux(target_reaction));
            } else {
                log::debug!(
                    "Envelope point at growth {:.4} is {}",
                    growth,
                    solution.status
                );
            }
        }
        data.push(EnvelopePoint {
            growth_rate: round4(growth),
            min_flux: extremes[0],
            max_flux: extremes[1],
        });
    }
    let max_yield = data.iter().map(|p| p.max_flux).fold(0.0, f64::max);
    Ok(ProductionEnvelope {
        target_reaction: target_reaction.to_string(),
        data,
        max_yield,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::solvers::clarabel::ClarabelSolver;
    use crate::test_models::toy_model;

    #[test]
    fn lactate_envelope() {
        let model = toy_model();
        let envelope = production_envelope(&model, &ClarabelSolver::default(), "LDH", 5).unwrap();
        assert_eq!(envelope.data.len(), 5);
        assert_eq!(envelope.data[0].growth_rate, 0.0);
        assert!((envelope.data[4].growth_rate - 2.0).abs() < 1e-3);
        // no growth leaves all 20 pyruvate for lactate
        assert!((envelope.data[0].max_flux - 20.0).abs() < 1e-2);
        assert!(envelope.data[4].max_flux.abs() < 1e-2);
        // growth 1.0 needs 10 pyruvate through PDH
        assert!((envelope.data[2].max_flux - 10.0).abs() < 1e-2);
        assert!((envelope.max_yield - 20.0).abs() < 1e-2);
        assert!(envelope.data.iter().all(|p| p.min_flux.abs() < 1e-2));
    }

    #[test]
    fn unknown_target() {
        let model = toy_model();
        assert!(matches!(
            production_envelope(&model, &ClarabelSolver::default(), "NOPE", 5),
            Err(OptimizeError::ReactionNotFound(_))
        ));
    }
}
