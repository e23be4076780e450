//! Economic and toxicity impact of secreted byproducts
//!
//! Byproducts are looked up in a [`ByproductDatabase`], classified into one of four
//! [`ImpactQuadrant`]s and, for a few well known waste products, paired with an upcycling
//! strategy.
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metabolic_model::model::Model;
use crate::utils::numeric::{round_to, sanitize_float};

/// Concentrations at or below this are ignored
const NEGLIGIBLE_CONCENTRATION: f64 = 1e-3;
/// Economic value (in $) above which a byproduct is considered valuable
const VALUE_THRESHOLD: f64 = 1.0;
/// Toxicity index from which a byproduct is considered toxic
const TOXICITY_THRESHOLD: f64 = 4.0;

/// Reference data of a byproduct
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ByproductRecord {
    pub name: String,
    /// 0 (safe) to 10 (lethal)
    pub toxicity: f64,
    /// $/kg
    pub price: f64,
    /// g/mol
    #[serde(rename = "mw")]
    pub molecular_weight: f64,
    pub category: String,
}

impl ByproductRecord {
    fn new(name: &str, toxicity: f64, price: f64, molecular_weight: f64, category: &str) -> Self {
        ByproductRecord {
            name: name.to_string(),
            toxicity,
            price,
            molecular_weight,
            category: category.to_string(),
        }
    }

    /// Record used for ids missing from the database, medium toxicity and no value
    pub fn unknown(id: &str) -> Self {
        ByproductRecord::new(id, 3.0, 0.0, 100.0, "Unknown")
    }
}

/// Byproduct reference table keyed by (extracellular) metabolite id
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ByproductDatabase {
    records: IndexMap<String, ByproductRecord>,
}

impl Default for ByproductDatabase {
    fn default() -> Self {
        let records = [
            ("ac_e", ByproductRecord::new("Acetate", 4.5, 0.5, 60.05, "Organic Acid")),
            ("lac__D_e", ByproductRecord::new("D-Lactate", 6.0, 1.2, 90.08, "Organic Acid")),
            ("for_e", ByproductRecord::new("Formate", 7.5, 0.3, 46.03, "Organic Acid")),
            ("etoh_e", ByproductRecord::new("Ethanol", 5.0, 0.8, 46.07, "Alcohol")),
            ("succ_e", ByproductRecord::new("Succinate", 1.5, 2.5, 118.09, "Organic Acid")),
            ("pyr_e", ByproductRecord::new("Pyruvate", 2.0, 15.0, 88.06, "Organic Acid")),
            ("co2_e", ByproductRecord::new("Carbon Dioxide", 0.1, 0.0, 44.01, "Gas")),
            ("h2o_e", ByproductRecord::new("Water", 0.0, 0.0, 18.01, "Solvent")),
            ("nh4_e", ByproductRecord::new("Ammonium", 8.0, 0.4, 18.04, "Nitrogen Source")),
        ]
        .into_iter()
        .map(|(id, record)| (id.to_string(), record))
        .collect();
        ByproductDatabase { records }
    }
}

impl ByproductDatabase {
    /// A database without any records, every lookup yields [`ByproductRecord::unknown`]
    pub fn empty() -> Self {
        ByproductDatabase {
            records: IndexMap::new(),
        }
    }

    /// Read a table from a JSON object of id to record
    pub fn read_json(path: &Path) -> Result<Self, ByproductError> {
        let file = File::open(path).map_err(|_| ByproductError::UnableToRead)?;
        let database: ByproductDatabase = serde_json::from_reader(BufReader::new(file))?;
        log::info!(
            "Loaded {} byproduct records from {}",
            database.records.len(),
            path.display()
        );
        Ok(database)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ByproductError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Add or replace a record
    pub fn insert(&mut self, id: &str, record: ByproductRecord) -> Option<ByproductRecord> {
        self.records.insert(id.to_string(), record)
    }

    pub fn get(&self, id: &str) -> Option<&ByproductRecord> {
        self.records.get(id)
    }

    /// The record of `id`, or the unknown record named after `id`
    pub fn lookup(&self, id: &str) -> ByproductRecord {
        self.records
            .get(id)
            .cloned()
            .unwrap_or_else(|| ByproductRecord::unknown(id))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Classify every byproduct with a concentration above 1e-3
    ///
    /// The mass is `concentration * mw / 1000` kg, its economic value `mass * price`. The
    /// result is ordered by decreasing toxicity, equal toxicities keep the input order.
    pub fn analyze_impact(&self, concentrations: &IndexMap<String, f64>) -> Vec<ByproductImpact> {
        let mut impacts: Vec<ByproductImpact> = concentrations
            .iter()
            .filter(|(_, concentration)| sanitize_float(**concentration) > NEGLIGIBLE_CONCENTRATION)
            .map(|(id, concentration)| {
                let record = self.lookup(id);
                let mass_kg = concentration * record.molecular_weight / 1000.0;
                let economic_value = sanitize_float(mass_kg * record.price);
                ByproductImpact {
                    id: id.clone(),
                    name: record.name,
                    concentration: round_to(*concentration, 2),
                    toxicity_index: record.toxicity,
                    economic_value: round_to(economic_value, 4),
                    price_per_kg: record.price,
                    quadrant: ImpactQuadrant::classify(economic_value, record.toxicity),
                    category: record.category,
                }
            })
            .collect();
        // sort_by is stable
        impacts.sort_by(|a, b| b.toxicity_index.total_cmp(&a.toxicity_index));
        impacts
    }
}

/// Position of a byproduct on the value / toxicity plane
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactQuadrant {
    /// Valuable and low toxicity
    #[serde(rename = "Value-Add")]
    ValueAdd,
    /// Valuable but toxic
    #[serde(rename = "High Risk")]
    HighRisk,
    /// Toxic without value
    #[serde(rename = "Critical Waste")]
    CriticalWaste,
    #[serde(rename = "Neutral")]
    Neutral,
}

impl ImpactQuadrant {
    /// Value is high strictly above 1.0, toxicity is high from 4.0 on
    pub fn classify(economic_value: f64, toxicity: f64) -> Self {
        let valuable = economic_value > VALUE_THRESHOLD;
        let toxic = toxicity >= TOXICITY_THRESHOLD;
        match (valuable, toxic) {
            (true, false) => ImpactQuadrant::ValueAdd,
            (true, true) => ImpactQuadrant::HighRisk,
            (false, true) => ImpactQuadrant::CriticalWaste,
            (false, false) => ImpactQuadrant::Neutral,
        }
    }

    /// Whether the byproduct is worth engineering away
    pub fn is_concerning(&self) -> bool {
        matches!(self, ImpactQuadrant::HighRisk | ImpactQuadrant::CriticalWaste)
    }
}

impl Display for ImpactQuadrant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ImpactQuadrant::ValueAdd => "Value-Add",
            ImpactQuadrant::HighRisk => "High Risk",
            ImpactQuadrant::CriticalWaste => "Critical Waste",
            ImpactQuadrant::Neutral => "Neutral",
        };
        write!(f, "{}", text)
    }
}

/// Classified byproduct
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ByproductImpact {
    pub id: String,
    pub name: String,
    /// Concentration rounded to two decimals
    pub concentration: f64,
    pub toxicity_index: f64,
    /// Economic value rounded to four decimals
    pub economic_value: f64,
    pub price_per_kg: f64,
    pub quadrant: ImpactQuadrant,
    pub category: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpcyclingSuggestion {
    pub target: String,
    pub strategy: String,
    pub benefit: String,
}

/// Byproduct id, target name, strategy, benefit
const UPCYCLING_RULES: [(&str, &str, &str, &str); 2] = [
    (
        "ac_e",
        "Acetate",
        "Install Acetyl-CoA Synthetase (acs)",
        "Recycles Acetate back to Acetyl-CoA ($0.5/kg -> Energy)",
    ),
    (
        "lac__D_e",
        "Lactate",
        "Knockout LDH_D or Engineer Lactate Permease",
        "Eliminates toxic buildup, redirects carbon to target.",
    ),
];

/// Engineering strategies for the high risk and critical waste byproducts with a known remedy
pub fn suggest_upcycling(impacts: &[ByproductImpact]) -> Vec<UpcyclingSuggestion> {
    impacts
        .iter()
        .filter(|impact| impact.quadrant.is_concerning())
        .filter_map(|impact| {
            UPCYCLING_RULES
                .iter()
                .find(|(id, ..)| *id == impact.id)
                .map(|(_, target, strategy, benefit)| UpcyclingSuggestion {
                    target: target.to_string(),
                    strategy: strategy.to_string(),
                    benefit: benefit.to_string(),
                })
        })
        .collect()
}

/// A reaction connected to a traced metabolite
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReactionLink {
    pub id: String,
    pub name: Option<String>,
    pub stoichiometry: f64,
}

/// Structural origin of a byproduct
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OriginTrace {
    pub byproduct_id: String,
    /// Non exchange reactions producing the byproduct
    pub immediate_precursors: Vec<ReactionLink>,
    /// Non exchange reactions consuming the byproduct
    pub consumers: Vec<ReactionLink>,
    /// First upstream metabolite shared by more than one consuming reaction
    pub branch_point: Option<String>,
}

/// Upper limit on the number of linear steps walked back from the byproduct
const MAX_TRACE_DEPTH: usize = 25;

/// Trace a byproduct back through the network
///
/// The branch point is found by stepping from a metabolite to the substrate of its producers
/// with the most consuming reactions, for as long as that substrate only feeds a single
/// reaction.
pub fn trace_origin(model: &Model, metabolite_id: &str) -> Result<OriginTrace, ByproductError> {
    if !model.metabolites.contains_key(metabolite_id) {
        return Err(ByproductError::MetaboliteNotFound(metabolite_id.to_string()));
    }
    let link = |id: &str, name: &Option<String>, stoichiometry: f64| ReactionLink {
        id: id.to_string(),
        name: name.clone(),
        stoichiometry,
    };
    let mut immediate_precursors = Vec::new();
    let mut consumers = Vec::new();
    for (reaction, coef) in model.metabolite_reactions(metabolite_id) {
        if reaction.is_exchange() {
            continue;
        }
        if coef > 0.0 {
            immediate_precursors.push(link(&reaction.id, &reaction.name, coef));
        } else if coef < 0.0 {
            consumers.push(link(&reaction.id, &reaction.name, coef));
        }
    }

    let mut visited: IndexSet<String> = IndexSet::new();
    visited.insert(metabolite_id.to_string());
    let mut current = metabolite_id.to_string();
    let mut branch_point = None;
    for _ in 0..MAX_TRACE_DEPTH {
        let Some((substrate, consumer_count)) = busiest_upstream_substrate(model, &current, &visited)
        else {
            break;
        };
        if consumer_count > 1 {
            branch_point = Some(substrate);
            break;
        }
        visited.insert(substrate.clone());
        current = substrate;
    }

    Ok(OriginTrace {
        byproduct_id: metabolite_id.to_string(),
        immediate_precursors,
        consumers,
        branch_point,
    })
}

/// Substrate of the reactions producing `metabolite_id` with the most consuming reactions
fn busiest_upstream_substrate(
    model: &Model,
    metabolite_id: &str,
    visited: &IndexSet<String>,
) -> Option<(String, usize)> {
    let mut best: Option<(String, usize)> = None;
    for (reaction, coef) in model.metabolite_reactions(metabolite_id) {
        if coef <= 0.0 || reaction.is_exchange() {
            continue;
        }
        for substrate in reaction.substrates() {
            if visited.contains(substrate) {
                continue;
            }
            let count = model
                .metabolite_reactions(substrate)
                .iter()
                .filter(|(r, c)| *c < 0.0 && !r.is_exchange())
                .count();
            if best.as_ref().map_or(true, |(_, n)| count > *n) {
                best = Some((substrate.to_string(), count));
            }
        }
    }
    best
}

#[derive(Error, Debug)]
pub enum ByproductError {
    #[error("Metabolite {0} not found in the model")]
    MetaboliteNotFound(String),
    #[error("Unable to read byproduct database file")]
    UnableToRead,
    #[error("Unable to parse byproduct database: {0}")]
    UnableToParse(#[from] serde_json::Error),
}
