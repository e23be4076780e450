//! This module provides a struct for representing reactions
use super::model::Gpr;
use crate::configuration::{default_lower_bound, default_upper_bound};
use crate::metabolic_model::gene::GeneActivity;
use derive_builder::Builder;
use indexmap::IndexMap;

/// Represents a reaction in the metabolic model
#[derive(Builder, Debug, Clone)]
pub struct Reaction {
    /// Used to identify the reaction
    pub id: String,
    /// Metabolite stoichiometry of the reaction
    #[builder(default = "IndexMap::new()")]
    pub metabolites: IndexMap<String, f64>,
    /// Human-readable reaction name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Gene Protein Reaction rule to determine if reaction is active
    #[builder(default = "None")]
    pub gpr: Option<Gpr>,
    /// Gene rule text which could not be parsed, kept so it is written back unchanged
    #[builder(default = "None")]
    pub unparsed_rule: Option<String>,
    /// Lower flux bound
    #[builder(default = "default_lower_bound()")]
    pub lower_bound: f64,
    /// Upper flux bound
    #[builder(default = "default_upper_bound()")]
    pub upper_bound: f64,
    /// Reaction subsystem
    #[builder(default = "None")]
    pub subsystem: Option<String>,
    /// Notes about the reaction
    #[builder(default = "None")]
    pub notes: Option<String>,
    /// Reaction Annotations
    #[builder(default = "None")]
    pub annotation: Option<String>,
    /// Reaction Activity
    #[builder(default = "ReactionActivity::Active")]
    pub activity: ReactionActivity,
}

impl Reaction {
    /// Whether this is a boundary (exchange) reaction, i.e. it touches exactly one metabolite
    pub fn is_exchange(&self) -> bool {
        self.metabolites.len() == 1
    }

    /// Whether the reaction has a gene protein reaction rule
    pub fn has_genes(&self) -> bool {
        self.gpr.is_some()
    }

    /// Ids of the genes referenced by the reaction's GPR
    pub fn gene_ids(&self) -> Vec<String> {
        match &self.gpr {
            Some(gpr) => gpr.gene_ids(),
            None => Vec::new(),
        }
    }

    /// Stoichiometric coefficient of a metabolite in this reaction (0 if not involved)
    pub fn coefficient(&self, metabolite_id: &str) -> f64 {
        self.metabolites.get(metabolite_id).copied().unwrap_or(0.0)
    }

    /// Ids of metabolites consumed by the reaction (negative coefficients)
    pub fn substrates(&self) -> Vec<&str> {
        self.metabolites
            .iter()
            .filter(|(_, coef)| **coef < 0.0)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Disable the reaction by forcing both flux bounds to zero
    pub fn knock_out(&mut self) {
        self.lower_bound = 0.0;
        self.upper_bound = 0.0;
        self.activity = ReactionActivity::Inactive;
    }

    /// Lower bound as seen by the optimization problem, 0 when inactive
    pub(crate) fn effective_lower_bound(&self) -> f64 {
        match self.activity {
            ReactionActivity::Active => self.lower_bound,
            ReactionActivity::Inactive => 0f64,
        }
    }

    /// Upper bound as seen by the optimization problem, 0 when inactive
    pub(crate) fn effective_upper_bound(&self) -> f64 {
        match self.activity {
            ReactionActivity::Active => self.upper_bound,
            ReactionActivity::Inactive => 0f64,
        }
    }
}

/// Whether a Reaction is active or inactive
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReactionActivity {
    /// The Reaction is active and can carry flux
    Active,
    /// The Reaction is inactive and can't carry flux
    Inactive,
}

impl From<GeneActivity> for ReactionActivity {
    fn from(value: GeneActivity) -> Self {
        match value {
            GeneActivity::Active => ReactionActivity::Active,
            GeneActivity::Inactive => ReactionActivity::Inactive,
        }
    }
}
