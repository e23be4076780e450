//! Process wide defaults used when building models and selecting solvers
use std::sync::{LazyLock, RwLock};

use serde::{Deserialize, Serialize};

pub static CONFIGURATION: LazyLock<RwLock<Configuration>> =
    LazyLock::new(|| RwLock::new(Configuration::default()));

pub struct Configuration {
    /// Default lower flux bound for new reactions
    pub lower_bound: f64,
    /// Default upper flux bound for new reactions
    pub upper_bound: f64,
    /// Flux magnitude below which an exchange is considered inactive
    pub tolerance: f64,
    /// Solver used when a simulator is created without an explicit one
    pub solver: SolverKind,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            lower_bound: -1000.,
            upper_bound: 1000.,
            tolerance: 1e-06,
            solver: SolverKind::Clarabel,
        }
    }
}

/// Enum used to specify the default solver to use
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SolverKind {
    /// Use the Clarabel interior point solver, supports quadratic objectives and dual values
    Clarabel,
    /// Use the microlp simplex solver, requires the minilp feature to be enabled
    Microlp,
}

/// Read the default lower bound, falling back to the built in default if the lock is poisoned
pub(crate) fn default_lower_bound() -> f64 {
    CONFIGURATION
        .read()
        .map(|c| c.lower_bound)
        .unwrap_or(Configuration::default().lower_bound)
}

/// Read the default upper bound, falling back to the built in default if the lock is poisoned
pub(crate) fn default_upper_bound() -> f64 {
    CONFIGURATION
        .read()
        .map(|c| c.upper_bound)
        .unwrap_or(Configuration::default().upper_bound)
}

/// Read the exchange flux tolerance
pub(crate) fn tolerance() -> f64 {
    CONFIGURATION
        .read()
        .map(|c| c.tolerance)
        .unwrap_or(Configuration::default().tolerance)
}

/// Read the configured solver kind
pub(crate) fn solver_kind() -> SolverKind {
    CONFIGURATION
        .read()
        .map(|c| c.solver)
        .unwrap_or(Configuration::default().solver)
}

/// Environment related constants used by the constraint configurator
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnvironmentSettings {
    /// Prefix of carbon source exchange reactions, the exchange id is `{prefix}{source}{suffix}`
    pub exchange_prefix: String,
    /// Suffix of carbon source exchange reactions
    pub exchange_suffix: String,
    /// Id of the oxygen exchange reaction
    pub oxygen_exchange: String,
    /// Oxygen exchange lower bound under aerobic conditions
    pub aerobic_oxygen_bound: f64,
    /// Oxygen exchange lower bound under anaerobic conditions
    pub anaerobic_oxygen_bound: f64,
}

impl EnvironmentSettings {
    /// Exchange reaction id for a carbon source such as `glc__D`
    pub fn carbon_exchange_id(&self, carbon_source: &str) -> String {
        format!(
            "{}{}{}",
            self.exchange_prefix, carbon_source, self.exchange_suffix
        )
    }
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        EnvironmentSettings {
            exchange_prefix: "EX_".to_string(),
            exchange_suffix: "_e".to_string(),
            oxygen_exchange: "EX_o2_e".to_string(),
            aerobic_oxygen_bound: -20.0,
            anaerobic_oxygen_bound: 0.0,
        }
    }
}
