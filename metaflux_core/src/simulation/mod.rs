//! Simulation of a metabolic model under a configurable environment and genetic background
//!
//! A [`Simulator`] owns an untouched copy of the model it was created with and a working copy
//! all constraints are applied to. Every analysis runs on the working copy, [`Simulator::reset`]
//! restores it from the untouched copy.
pub mod dynamic;
pub mod session;

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::byproduct::{trace_origin, ByproductDatabase, ByproductError, OriginTrace};
use crate::analysis::omics::apply_expression;
use crate::analysis::projection::{project_fluxes, FluxProjection};
use crate::analysis::solution::{
    analyze_solution, top_byproducts, ExchangeFlux, SolutionAnalysisSettings, StaticAnalysis,
};
use crate::configuration::EnvironmentSettings;
use crate::design::strain::{optimize_knockouts, DesignParameters, DesignResult};
use crate::design::DesignError;
use crate::io::json::JsonError;
use crate::metabolic_model::model::{Model, SearchHit};
use crate::optimize::envelope::ProductionEnvelope;
use crate::optimize::fba::optimize;
use crate::optimize::fva::{flux_variability, FluxRange};
use crate::optimize::moma::{moma, DistanceMetric};
use crate::optimize::solvers::{from_configuration, Solver};
use crate::optimize::{envelope, OptimizationStatus, OptimizeError};
use crate::simulation::dynamic::{simulate_dynamic, DynamicParameters, DynamicResult};
use crate::utils::numeric::sanitize_float;

/// Flux magnitude above which a reaction is picked for default variability analysis
const FVA_FLUX_THRESHOLD: f64 = 1.0;
/// Maximum number of reactions in a variability analysis
const FVA_REACTION_CAP: usize = 50;

/// Growth conditions applied by [`Simulator::apply_environment`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    /// Carbon source metabolite stem, e.g. `glc__D`
    pub carbon_source: String,
    /// Lower bound of the carbon source exchange, at most 0
    pub uptake_rate: f64,
    pub aerobic: bool,
}

impl Default for Environment {
    fn default() -> Self {
        Environment {
            carbon_source: "glc__D".to_string(),
            uptake_rate: -10.0,
            aerobic: true,
        }
    }
}

/// Result of a MOMA run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MomaAnalysis {
    pub status: OptimizationStatus,
    /// Objective flux of the adjusted state
    pub growth_rate: f64,
    pub fluxes: IndexMap<String, f64>,
    pub byproducts: Vec<ExchangeFlux>,
    pub metric: DistanceMetric,
    pub distance: f64,
}

/// Result of constraining the model with expression data
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OmicsAnalysis {
    /// Flux bound derived for each expressed reaction
    pub applied_bounds: IndexMap<String, f64>,
    pub analysis: StaticAnalysis,
}

pub struct Simulator {
    pristine: Model,
    model: Model,
    environment: Option<Environment>,
    environment_settings: EnvironmentSettings,
    byproducts: ByproductDatabase,
    analysis_settings: SolutionAnalysisSettings,
    solver: Box<dyn Solver>,
}

impl Simulator {
    /// Create a simulator using the configured default solver
    pub fn new(model: Model) -> Self {
        Simulator::with_solver(model, from_configuration())
    }

    pub fn with_solver(model: Model, solver: Box<dyn Solver>) -> Self {
        Simulator {
            pristine: model.clone(),
            model,
            environment: None,
            environment_settings: EnvironmentSettings::default(),
            byproducts: ByproductDatabase::default(),
            analysis_settings: SolutionAnalysisSettings::default(),
            solver,
        }
    }

    /// Load a COBRA JSON model
    pub fn from_json_file(path: &Path) -> Result<Self, SimulationError> {
        Ok(Simulator::new(Model::read_json(path)?))
    }

    pub fn with_byproduct_database(mut self, database: ByproductDatabase) -> Self {
        self.byproducts = database;
        self
    }

    pub fn with_environment_settings(mut self, settings: EnvironmentSettings) -> Self {
        self.environment_settings = settings;
        self
    }

    pub fn with_analysis_settings(mut self, settings: SolutionAnalysisSettings) -> Self {
        self.analysis_settings = settings;
        self
    }

    /// The working copy
    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    /// The model as it was when the simulator was created
    pub fn pristine(&self) -> &Model {
        &self.pristine
    }

    pub fn solver(&self) -> &dyn Solver {
        self.solver.as_ref()
    }

    pub fn byproduct_database(&self) -> &ByproductDatabase {
        &self.byproducts
    }

    /// Environment applied since the last reset
    pub fn environment(&self) -> Option<&Environment> {
        self.environment.as_ref()
    }

    /// Replace the working copy by a fresh copy of the pristine model
    pub fn reset(&mut self) {
        self.model = self.pristine.clone();
        self.environment = None;
    }

    /// Reset, then apply the carbon source uptake and oxygen availability
    ///
    /// Exchange reactions missing from the model are skipped. The uptake rate is a lower
    /// bound and must not be positive.
    pub fn apply_environment(
        &mut self,
        carbon_source: &str,
        uptake_rate: f64,
        aerobic: bool,
    ) -> Result<(), SimulationError> {
        if !(uptake_rate.is_finite() && uptake_rate <= 0.0) {
            return Err(SimulationError::InvalidParameter(format!(
                "uptake rate must be a finite value <= 0, got {}",
                uptake_rate
            )));
        }
        self.reset();
        let environment = Environment {
            carbon_source: carbon_source.to_string(),
            uptake_rate,
            aerobic,
        };
        configure_environment(&mut self.model, &self.environment_settings, &environment);
        log::debug!(
            "Applied environment: {} uptake {} ({})",
            carbon_source,
            uptake_rate,
            if aerobic { "aerobic" } else { "anaerobic" }
        );
        self.environment = Some(environment);
        Ok(())
    }

    /// Apply knockouts and forced minimum fluxes to the working copy
    ///
    /// Knockout ids are looked up as genes first, then as reactions. Overexpression raises a
    /// reaction's lower bound to at least the given flux, capped at its upper bound. Unknown
    /// ids are skipped and returned.
    pub fn apply_modifications(
        &mut self,
        knockouts: &[String],
        overexpressions: &IndexMap<String, f64>,
    ) -> Vec<String> {
        let mut skipped = Vec::new();
        for id in knockouts {
            if self.model.genes.contains_key(id) {
                match self.model.knock_out_gene(id) {
                    Ok(disabled) => {
                        log::debug!("Knocked out gene {}, disabled {:?}", id, disabled)
                    }
                    Err(err) => {
                        log::debug!("Gene knockout {} incomplete: {}", id, err);
                    }
                }
            } else if self.model.knock_out_reaction(id) {
                log::debug!("Knocked out reaction {}", id);
            } else {
                log::debug!("Skipping unknown knockout {}", id);
                skipped.push(id.clone());
            }
        }
        for (id, min_flux) in overexpressions {
            let Some(reaction) = self.model.reactions.get_mut(id) else {
                log::debug!("Skipping unknown overexpression {}", id);
                skipped.push(id.clone());
                continue;
            };
            if !min_flux.is_finite() {
                skipped.push(id.clone());
                continue;
            }
            let raised = reaction.lower_bound.max(*min_flux);
            if raised > reaction.upper_bound {
                log::warn!(
                    "Overexpression of {} to {} exceeds its upper bound {}",
                    id,
                    min_flux,
                    reaction.upper_bound
                );
            }
            reaction.lower_bound = raised.min(reaction.upper_bound);
        }
        skipped
    }

    /// Flux balance analysis of the working copy, summarized
    pub fn simulate(&self) -> Result<StaticAnalysis, SimulationError> {
        let solution = optimize(&self.model, self.solver.as_ref())?;
        Ok(analyze_solution(
            &self.model,
            &solution,
            &self.byproducts,
            &self.analysis_settings,
        )?)
    }

    /// Batch fermentation of the working copy
    ///
    /// Mutates the carbon exchange bound of the working copy, reset before reusing it.
    pub fn simulate_dynamic(
        &mut self,
        params: &DynamicParameters,
    ) -> Result<DynamicResult, SimulationError> {
        simulate_dynamic(&mut self.model, self.solver.as_ref(), &self.byproducts, params)
    }

    /// Flux variability of the working copy
    ///
    /// Without explicit reactions, the reactions carrying more than 1.0 flux at the optimum
    /// are analyzed. At most 50 reactions are analyzed.
    pub fn simulate_fva(
        &self,
        reaction_ids: Option<&[String]>,
        fraction_of_optimum: f64,
    ) -> Result<IndexMap<String, FluxRange>, SimulationError> {
        let mut ids: Vec<String> = match reaction_ids {
            Some(ids) if !ids.is_empty() => ids.to_vec(),
            _ => {
                let solution = optimize(&self.model, self.solver.as_ref())?;
                if !solution.is_optimal() {
                    return Err(SimulationError::NonOptimal(solution.status));
                }
                solution
                    .fluxes
                    .iter()
                    .filter(|(_, flux)| sanitize_float(**flux).abs() > FVA_FLUX_THRESHOLD)
                    .map(|(id, _)| id.clone())
                    .collect()
            }
        };
        ids.truncate(FVA_REACTION_CAP);
        Ok(flux_variability(
            &self.model,
            self.solver.as_ref(),
            &ids,
            fraction_of_optimum,
        )?)
    }

    /// Production envelope of a target reaction on the working copy
    pub fn production_envelope(
        &self,
        target_reaction: &str,
        points: usize,
    ) -> Result<ProductionEnvelope, SimulationError> {
        Ok(envelope::production_envelope(
            &self.model,
            self.solver.as_ref(),
            target_reaction,
            points,
        )?)
    }

    /// MOMA of the working copy against the wild type under the current environment
    pub fn simulate_moma(&self) -> Result<MomaAnalysis, SimulationError> {
        let mut wild_type = self.pristine.clone();
        if let Some(environment) = &self.environment {
            configure_environment(&mut wild_type, &self.environment_settings, environment);
        }
        let reference = optimize(&wild_type, self.solver.as_ref())?;
        if !reference.is_optimal() {
            return Err(SimulationError::NonOptimal(reference.status));
        }
        let result = moma(&self.model, &reference.fluxes, self.solver.as_ref())?;
        if !result.solution.is_optimal() {
            return Err(SimulationError::NonOptimal(result.solution.status));
        }
        let fluxes: IndexMap<String, f64> = result
            .solution
            .fluxes
            .iter()
            .map(|(id, flux)| (id.clone(), sanitize_float(*flux)))
            .collect();
        Ok(MomaAnalysis {
            status: result.solution.status,
            growth_rate: sanitize_float(result.solution.objective_value),
            byproducts: top_byproducts(
                &self.model,
                &fluxes,
                self.analysis_settings.byproduct_count,
            ),
            fluxes,
            metric: result.metric,
            distance: sanitize_float(result.distance),
        })
    }

    /// Reset, constrain the working copy with gene expression data and analyze it
    pub fn integrate_omics(
        &mut self,
        gene_expression: &IndexMap<String, f64>,
        normalization_factor: f64,
    ) -> Result<OmicsAnalysis, SimulationError> {
        if !normalization_factor.is_finite() || normalization_factor < 0.0 {
            return Err(SimulationError::InvalidParameter(format!(
                "normalization factor must be a finite value >= 0, got {}",
                normalization_factor
            )));
        }
        self.reset();
        let applied_bounds = apply_expression(&mut self.model, gene_expression, normalization_factor);
        Ok(OmicsAnalysis {
            applied_bounds,
            analysis: self.simulate()?,
        })
    }

    /// Search genes and reactions of the model by id or name
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        self.model.search(query)
    }

    /// Search knockouts increasing the flux through `target_reaction`
    ///
    /// Runs on the working copy, so environment and modifications applied so far are part of the
    /// baseline. The working copy is unchanged afterwards.
    pub fn optimize_knockouts(
        &mut self,
        target_reaction: &str,
        params: &DesignParameters,
    ) -> Result<DesignResult, SimulationError> {
        Ok(optimize_knockouts(
            &mut self.model,
            self.solver.as_ref(),
            target_reaction,
            params,
        )?)
    }

    /// Place fluxes of the model's reactions in a 3D scene grouped by subsystem
    pub fn project_fluxes(&self, fluxes: &IndexMap<String, f64>) -> Vec<FluxProjection> {
        project_fluxes(&self.model, fluxes)
    }

    /// Structural origin of a byproduct metabolite
    pub fn trace_origin(&self, metabolite_id: &str) -> Result<OriginTrace, SimulationError> {
        Ok(trace_origin(&self.model, metabolite_id)?)
    }
}

/// Set the carbon uptake and oxygen bounds of an environment on `model`
fn configure_environment(model: &mut Model, settings: &EnvironmentSettings, environment: &Environment) {
    let carbon_exchange = settings.carbon_exchange_id(&environment.carbon_source);
    match model.reactions.get_mut(&carbon_exchange) {
        Some(reaction) => reaction.lower_bound = environment.uptake_rate,
        None => log::debug!("Carbon exchange {} not in model", carbon_exchange),
    }
    if let Some(oxygen) = model.reactions.get_mut(&settings.oxygen_exchange) {
        oxygen.lower_bound = if environment.aerobic {
            settings.aerobic_oxygen_bound
        } else {
            settings.anaerobic_oxygen_bound
        };
    }
}

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("Optimization failed: {0}")]
    Optimize(OptimizeError),
    #[error("Optimization was not successful, status: {0}")]
    NonOptimal(OptimizationStatus),
    #[error("Reaction {0} not found in the model")]
    ReactionNotFound(String),
    #[error("Metabolite {0} not found in the model")]
    MetaboliteNotFound(String),
    #[error("Model has no objective")]
    MissingObjective,
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Unable to load model: {0}")]
    ModelLoad(#[from] JsonError),
    #[error("Model {0} not found")]
    ModelNotFound(String),
    #[error("Session lock for model {0} is poisoned")]
    PoisonedSession(String),
    #[error("Byproduct analysis failed: {0}")]
    Byproduct(ByproductError),
    #[error("Strain design failed: {0}")]
    Design(#[from] DesignError),
}

impl From<OptimizeError> for SimulationError {
    fn from(value: OptimizeError) -> Self {
        match value {
            OptimizeError::NonOptimal(status) => SimulationError::NonOptimal(status),
            OptimizeError::ReactionNotFound(id) => SimulationError::ReactionNotFound(id),
            OptimizeError::MissingObjective => SimulationError::MissingObjective,
            other => SimulationError::Optimize(other),
        }
    }
}

impl From<ByproductError> for SimulationError {
    fn from(value: ByproductError) -> Self {
        match value {
            ByproductError::MetaboliteNotFound(id) => SimulationError::MetaboliteNotFound(id),
            other => SimulationError::Byproduct(other),
        }
    }
}
