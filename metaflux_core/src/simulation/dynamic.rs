//! Dynamic flux balance analysis of a batch fermentation
//!
//! Biomass `X`, substrate `S` and secreted products are stepped forward with explicit Euler
//! integration, re-solving the flux balance problem at every step:
//!
//! - substrate uptake follows Michaelis-Menten kinetics, `v_s = V_max * S / (K_m + S)`
//! - growth is inhibited by each tracked toxin, `mu = mu_fba * prod(K_i / (K_i + P_i))`
//! - `dX/dt = mu * X`, `dS/dt = v_s * X`, `dP/dt = v_p * X`
use derive_builder::Builder;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::analysis::byproduct::{ByproductDatabase, ByproductImpact};
use crate::metabolic_model::model::Model;
use crate::optimize::fba::optimize;
use crate::optimize::solvers::Solver;
use crate::optimize::OptimizationStatus;
use crate::simulation::SimulationError;
use crate::utils::numeric::{round4, round_to, sanitize_float};

/// Number of steps between progress log messages
const PROGRESS_INTERVAL: usize = 5;

/// Settings of a dynamic simulation
#[derive(Builder, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[builder(default)]
#[serde(default)]
pub struct DynamicParameters {
    /// Initial substrate concentration (mmol/L)
    pub initial_glucose: f64,
    /// Initial biomass concentration (gDW/L)
    pub initial_biomass: f64,
    /// Simulated time (h)
    pub total_time: f64,
    /// Integration step (h)
    pub time_step: f64,
    /// Record the full flux vector at every step
    pub include_flux_history: bool,
    /// Michaelis constant of substrate uptake (mmol/L)
    pub km: f64,
    /// Maximal uptake rate, negative (mmol/gDW/h)
    pub vmax: f64,
    /// Exchange reaction of the carbon source
    #[builder(setter(into))]
    pub carbon_exchange: String,
    /// Exchange reaction id to inhibition constant `K_i` (mmol/L)
    pub toxicity_thresholds: IndexMap<String, f64>,
    /// Fraction of `K_i` above which a toxicity alert is raised
    pub alert_fraction: f64,
    /// Maximum number of alerts kept
    pub alert_cap: usize,
    /// Exchange flux above which a byproduct rate is recorded
    pub byproduct_threshold: f64,
    /// Absolute flux above which a reaction appears in a flux snapshot
    pub flux_snapshot_threshold: f64,
}

impl Default for DynamicParameters {
    fn default() -> Self {
        let toxicity_thresholds = [("EX_ac_e", 60.0), ("EX_lac__L_e", 40.0), ("EX_etoh_e", 30.0)]
            .into_iter()
            .map(|(id, k)| (id.to_string(), k))
            .collect();
        DynamicParameters {
            initial_glucose: 20.0,
            initial_biomass: 0.01,
            total_time: 24.0,
            time_step: 0.5,
            include_flux_history: false,
            km: 0.5,
            vmax: -10.0,
            carbon_exchange: "EX_glc__D_e".to_string(),
            toxicity_thresholds,
            alert_fraction: 0.8,
            alert_cap: 10,
            byproduct_threshold: 1e-4,
            flux_snapshot_threshold: 1e-3,
        }
    }
}

impl DynamicParameters {
    fn validate(&self) -> Result<(), SimulationError> {
        let invalid = |what: &str| Err(SimulationError::InvalidParameter(what.to_string()));
        if !(self.time_step.is_finite() && self.time_step > 0.0) {
            return invalid("time_step must be positive");
        }
        if !(self.total_time.is_finite() && self.total_time >= 0.0) {
            return invalid("total_time must be non-negative");
        }
        if !(self.initial_glucose.is_finite() && self.initial_glucose >= 0.0) {
            return invalid("initial_glucose must be non-negative");
        }
        if !(self.initial_biomass.is_finite() && self.initial_biomass >= 0.0) {
            return invalid("initial_biomass must be non-negative");
        }
        if !(self.km.is_finite() && self.km > 0.0) {
            return invalid("km must be positive");
        }
        if !self.vmax.is_finite() {
            return invalid("vmax must be finite");
        }
        if self.toxicity_thresholds.values().any(|k| !(k.is_finite() && *k > 0.0)) {
            return invalid("toxicity thresholds must be positive");
        }
        Ok(())
    }

    /// Michaelis-Menten uptake rate at substrate concentration `substrate`
    pub fn uptake_rate(&self, substrate: f64) -> f64 {
        sanitize_float(self.vmax * substrate / (self.km + substrate))
    }
}

/// Why the simulation loop stopped
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Ran until the total time
    TimeElapsed,
    /// All substrate was consumed
    SubstrateDepleted,
    /// A flux balance solve failed, the history ends at that step
    NonOptimal(OptimizationStatus),
}

/// A tracked toxin above the alert fraction of its inhibition constant
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToxicityAlert {
    pub time: f64,
    pub byproduct: String,
    pub concentration: f64,
}

/// Time courses of a dynamic simulation, every history has one entry per time point
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DynamicResult {
    pub time: Vec<f64>,
    pub biomass: Vec<f64>,
    pub glucose: Vec<f64>,
    pub growth_rates: Vec<f64>,
    /// Exchange reaction id to secretion rate per time point
    pub byproducts: IndexMap<String, Vec<f64>>,
    /// Flux snapshots, only filled when requested
    pub flux_history: Vec<IndexMap<String, f64>>,
    pub toxicity_alerts: Vec<ToxicityAlert>,
    /// Accumulated concentration per secreted exchange at the end of the run
    pub concentrations: IndexMap<String, f64>,
    pub byproduct_analysis: Vec<ByproductImpact>,
    pub termination: Termination,
}

impl DynamicResult {
    /// Whether the run stopped on a failed solve
    pub fn is_partial(&self) -> bool {
        matches!(self.termination, Termination::NonOptimal(_))
    }
}

/// Run a batch fermentation on `model`
///
/// The lower bound of the carbon exchange is overwritten at every step, the rest of the
/// constraints are used as configured. A failed solve ends the run early and the history up
/// to that point is returned.
pub fn simulate_dynamic(
    model: &mut Model,
    solver: &dyn Solver,
    database: &ByproductDatabase,
    params: &DynamicParameters,
) -> Result<DynamicResult, SimulationError> {
    params.validate()?;
    if !model.reactions.contains_key(&params.carbon_exchange) {
        return Err(SimulationError::ReactionNotFound(
            params.carbon_exchange.clone(),
        ));
    }
    let exchange_ids: Vec<String> = model.exchanges().map(|r| r.id.clone()).collect();

    let dt = params.time_step;
    let mut biomass = params.initial_biomass;
    let mut substrate = params.initial_glucose;
    let mut concentrations: IndexMap<String, f64> = params
        .toxicity_thresholds
        .keys()
        .map(|id| (id.clone(), 0.0))
        .collect();

    let mut time = Vec::new();
    let mut biomass_history = Vec::new();
    let mut glucose_history = Vec::new();
    let mut growth_rates = Vec::new();
    let mut byproducts: IndexMap<String, Vec<f64>> = IndexMap::new();
    let mut flux_history = Vec::new();
    let mut toxicity_alerts = Vec::new();
    let mut termination = Termination::TimeElapsed;

    log::info!(
        "Starting dynamic simulation: steps={}",
        (params.total_time / dt).floor()
    );
    let mut step = 0usize;
    loop {
        let t = step as f64 * dt;
        // tolerate rounding in step * dt
        if t > params.total_time + dt * 1e-9 {
            break;
        }
        if substrate <= 0.0 {
            termination = Termination::SubstrateDepleted;
            break;
        }
        if step % PROGRESS_INTERVAL == 0 {
            log::info!("Simulating time: {:.1}/{}", t, params.total_time);
        }
        time.push(round_to(t, 6));
        biomass_history.push(round4(biomass));
        glucose_history.push(round4(substrate));

        let uptake = params.uptake_rate(substrate);
        if let Some(reaction) = model.reactions.get_mut(&params.carbon_exchange) {
            reaction.lower_bound = uptake;
        }

        let solution = optimize(model, solver)?;
        if !solution.is_optimal() {
            log::warn!(
                "Dynamic simulation stopped at t={} with status {}",
                t,
                solution.status
            );
            growth_rates.push(0.0);
            termination = Termination::NonOptimal(solution.status);
            break;
        }

        let mut inhibition = 1.0;
        for (id, threshold) in &params.toxicity_thresholds {
            let current = concentrations.get(id).copied().unwrap_or(0.0);
            inhibition *= threshold / (threshold + current);
            if current > threshold * params.alert_fraction
                && toxicity_alerts.len() < params.alert_cap
            {
                toxicity_alerts.push(ToxicityAlert {
                    time: round_to(t, 6),
                    byproduct: id.clone(),
                    concentration: round4(current),
                });
            }
        }
        let growth = sanitize_float(sanitize_float(solution.objective_value) * inhibition);
        growth_rates.push(round4(growth));

        if params.include_flux_history {
            flux_history.push(
                solution
                    .fluxes
                    .iter()
                    .map(|(id, flux)| (id, sanitize_float(*flux)))
                    .filter(|(_, flux)| flux.abs() > params.flux_snapshot_threshold)
                    .map(|(id, flux)| (id.clone(), flux))
                    .collect(),
            );
        }

        for id in &exchange_ids {
            let flux = sanitize_float(solution.flux(id));
            if flux <= params.byproduct_threshold {
                continue;
            }
            byproducts
                .entry(id.clone())
                .or_insert_with(|| vec![0.0; step])
                .push(round4(flux));
            *concentrations.entry(id.clone()).or_insert(0.0) += flux * biomass * dt;
        }
        for history in byproducts.values_mut() {
            history.resize(step + 1, 0.0);
        }

        let carbon_flux = sanitize_float(solution.flux(&params.carbon_exchange));
        let next_biomass = biomass + growth * biomass * dt;
        let next_substrate = substrate + carbon_flux * biomass * dt;
        biomass = sanitize_float(next_biomass).max(0.0);
        substrate = sanitize_float(next_substrate).max(0.0);
        step += 1;
    }

    for history in byproducts.values_mut() {
        history.resize(time.len(), 0.0);
    }
    log::info!(
        "Dynamic simulation finished after {} points ({:?})",
        time.len(),
        termination
    );

    let by_metabolite: IndexMap<String, f64> = concentrations
        .iter()
        .map(|(id, concentration)| {
            let key = model
                .exchange_metabolite(id)
                .map(|m| m.id.clone())
                .unwrap_or_else(|| id.clone());
            (key, sanitize_float(*concentration))
        })
        .collect();
    let byproduct_analysis = database.analyze_impact(&by_metabolite);

    Ok(DynamicResult {
        time,
        biomass: biomass_history,
        glucose: glucose_history,
        growth_rates,
        byproducts,
        flux_history,
        toxicity_alerts,
        concentrations: concentrations
            .into_iter()
            .map(|(id, c)| (id, round4(c)))
            .collect(),
        byproduct_analysis,
        termination,
    })
}
