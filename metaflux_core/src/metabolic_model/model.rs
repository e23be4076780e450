//! This module provides the Model struct for representing an entire metabolic model
use std::fmt::{Display, Formatter};

use crate::metabolic_model::gene::{Gene, GeneActivity};
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::reaction::{Reaction, ReactionActivity};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of hits returned by [`Model::search`]
const MAX_SEARCH_RESULTS: usize = 20;

/// Represents a Genome Scale Metabolic Model
#[derive(Clone, Debug)]
pub struct Model {
    /// Map of reaction ids to Reaction Objects
    pub reactions: IndexMap<String, Reaction>,
    /// Map of gene ids to Gene Objects
    pub genes: IndexMap<String, Gene>,
    /// Map of metabolite ids to Metabolite Objects
    pub metabolites: IndexMap<String, Metabolite>,
    /// Map of reaction ids to objective function coefficients
    pub objective: IndexMap<String, f64>,
    /// Id associated with the Model
    pub id: Option<String>,
    /// Compartments in the model
    ///
    /// An IndexMap<String, String> of {short name: long name}
    pub compartments: Option<IndexMap<String, String>>,
    /// A version identifier for the Model, stored as a string
    pub version: Option<String>,
}

impl Model {
    pub fn new_empty() -> Self {
        Model {
            reactions: IndexMap::new(),
            genes: IndexMap::new(),
            metabolites: IndexMap::new(),
            objective: IndexMap::new(),
            id: None,
            compartments: None,
            version: None,
        }
    }

    /// Add a reaction to the model
    ///
    /// # Parameters
    /// - reaction: Reaction to add
    ///
    /// # Examples
    /// ```rust
    /// use metaflux_core::metabolic_model::model::Model;
    /// use metaflux_core::metabolic_model::reaction::{Reaction, ReactionBuilder};
    /// let mut model = Model::new_empty();
    /// let new_reaction = ReactionBuilder::default().id("new_reaction".to_string()).build().unwrap();
    /// model.add_reaction(new_reaction);
    /// ```
    pub fn add_reaction(&mut self, reaction: Reaction) {
        let id = reaction.id.clone();
        self.reactions.insert(id, reaction);
    }

    /// Add a gene to the model
    ///
    /// # Parameters
    /// - gene: Gene to add
    ///
    /// # Examples
    /// ```rust
    /// use metaflux_core::metabolic_model::gene::GeneBuilder;
    /// use metaflux_core::metabolic_model::model::Model;
    /// let mut model=Model::new_empty();
    /// let new_gene = GeneBuilder::default().id("new_gene".to_string()).build().unwrap();
    /// model.add_gene(new_gene);
    /// ```
    pub fn add_gene(&mut self, gene: Gene) {
        let id = gene.id.clone();
        self.genes.insert(id, gene);
    }

    /// Add a metabolite to the model
    pub fn add_metabolite(&mut self, metabolite: Metabolite) {
        let id = metabolite.id.clone();
        self.metabolites.insert(id, metabolite);
    }

    /// Id of the reaction carrying the objective (the first objective term)
    pub fn objective_reaction_id(&self) -> Option<&str> {
        self.objective.keys().next().map(|id| id.as_str())
    }

    /// Iterate over the exchange (boundary) reactions of the model
    pub fn exchanges(&self) -> impl Iterator<Item = &Reaction> {
        self.reactions.values().filter(|r| r.is_exchange())
    }

    /// Reactions in which a metabolite participates, paired with its coefficient
    pub fn metabolite_reactions(&self, metabolite_id: &str) -> Vec<(&Reaction, f64)> {
        self.reactions
            .values()
            .filter_map(|r| r.metabolites.get(metabolite_id).map(|coef| (r, *coef)))
            .collect()
    }

    /// The single metabolite of an exchange reaction
    pub fn exchange_metabolite(&self, reaction_id: &str) -> Option<&Metabolite> {
        let reaction = self.reactions.get(reaction_id)?;
        if !reaction.is_exchange() {
            return None;
        }
        let met_id = reaction.metabolites.keys().next()?;
        self.metabolites.get(met_id)
    }

    /// Knock out a gene, disabling every reaction whose GPR no longer evaluates to active
    ///
    /// Returns the ids of the reactions which were disabled.
    pub fn knock_out_gene(&mut self, gene_id: &str) -> Result<Vec<String>, GprError> {
        if !self.genes.contains_key(gene_id) {
            return Err(GprError::GeneNotFound(gene_id.to_string()));
        }
        // evaluated as if the gene were already inactive, nothing changes if a rule fails
        let mut disabled = Vec::new();
        for reaction in self.reactions.values() {
            let Some(gpr) = &reaction.gpr else { continue };
            if !gpr.contains_gene(gene_id) {
                continue;
            }
            if self.eval_gpr_without(gpr, Some(gene_id))? == GeneActivity::Inactive {
                disabled.push(reaction.id.clone());
            }
        }
        if let Some(gene) = self.genes.get_mut(gene_id) {
            gene.knock_out();
        }
        for id in &disabled {
            if let Some(reaction) = self.reactions.get_mut(id) {
                reaction.knock_out();
            }
        }
        Ok(disabled)
    }

    /// Knock out a single reaction, returns false if the reaction doesn't exist
    pub fn knock_out_reaction(&mut self, reaction_id: &str) -> bool {
        match self.reactions.get_mut(reaction_id) {
            Some(reaction) => {
                reaction.knock_out();
                true
            }
            None => false,
        }
    }

    /// Snapshot of every reaction's bounds and activity, keyed by reaction id
    pub fn bounds_snapshot(&self) -> IndexMap<String, (f64, f64, ReactionActivity)> {
        self.reactions
            .iter()
            .map(|(id, r)| (id.clone(), (r.lower_bound, r.upper_bound, r.activity)))
            .collect()
    }

    /// Case-insensitive search over gene and reaction ids and names
    ///
    /// Genes are listed before reactions, and at most 20 hits are returned.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let query = query.to_lowercase();
        let matches = |id: &str, name: &Option<String>| {
            id.to_lowercase().contains(&query)
                || name
                    .as_ref()
                    .map(|n| n.to_lowercase().contains(&query))
                    .unwrap_or(false)
        };
        let genes = self
            .genes
            .values()
            .filter(|g| matches(&g.id, &g.name))
            .map(|g| SearchHit {
                id: g.id.clone(),
                name: g.name.clone().unwrap_or_default(),
                kind: SearchHitKind::Gene,
            });
        let reactions = self
            .reactions
            .values()
            .filter(|r| matches(&r.id, &r.name))
            .map(|r| SearchHit {
                id: r.id.clone(),
                name: r.name.clone().unwrap_or_default(),
                kind: SearchHitKind::Reaction,
            });
        genes.chain(reactions).take(MAX_SEARCH_RESULTS).collect()
    }
}

/// A single result of [`Model::search`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SearchHitKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchHitKind {
    Gene,
    Reaction,
}

// region GPR Functionality
/// Representation of a Gene Protein Reaction Rule as an AST
#[derive(Clone, Debug, PartialEq)]
pub enum Gpr {
    /// Operation on two genes (see [`GprOperation`])
    Operation(GprOperation),
    /// A terminal gene Node (see [`Gene`])
    GeneNode(String),
}

impl Display for Gpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_id())
    }
}

impl Gpr {
    /// Create a new binary operation node
    pub fn new_binary_operation(
        left: Gpr,
        operator: GprOperatorType,
        right: Gpr,
    ) -> Result<Gpr, GprError> {
        let op = match operator {
            GprOperatorType::Or => GprOperation::Or {
                left: Box::new(left),
                right: Box::new(right),
            },
            GprOperatorType::And => GprOperation::And {
                left: Box::new(left),
                right: Box::new(right),
            },
            GprOperatorType::Not => return Err(GprError::InvalidBinaryOp),
        };
        Ok(Gpr::Operation(op))
    }

    /// Create a new unary operation node
    pub fn new_unary_operation(operator: GprOperatorType, operand: Gpr) -> Result<Gpr, GprError> {
        let op = match operator {
            GprOperatorType::Not => GprOperation::Not {
                val: Box::new(operand),
            },
            _ => return Err(GprError::InvalidUnaryOp),
        };
        Ok(Gpr::Operation(op))
    }

    /// Create a new gene node
    pub fn new_gene_node(gene: &str) -> Gpr {
        Gpr::GeneNode(gene.to_string())
    }

    /// Generate a GPR string with gene ids from the GPR AST
    pub fn to_string_id(&self) -> String {
        match self {
            Gpr::Operation(op) => match op {
                GprOperation::Or { left, right } => {
                    format!("({} or {})", left.to_string_id(), right.to_string_id())
                }
                GprOperation::And { left, right } => {
                    format!("({} and {})", left.to_string_id(), right.to_string_id())
                }
                GprOperation::Not { val } => {
                    format!("(not {})", val)
                }
            },
            Gpr::GeneNode(gene_ref) => gene_ref.to_string(),
        }
    }

    /// Unique gene ids referenced in the rule, in order of first appearance
    pub fn gene_ids(&self) -> Vec<String> {
        let mut ids = IndexSet::new();
        self.collect_gene_ids(&mut ids);
        ids.into_iter().collect()
    }

    fn collect_gene_ids(&self, ids: &mut IndexSet<String>) {
        match self {
            Gpr::Operation(GprOperation::Or { left, right })
            | Gpr::Operation(GprOperation::And { left, right }) => {
                left.collect_gene_ids(ids);
                right.collect_gene_ids(ids);
            }
            Gpr::Operation(GprOperation::Not { val }) => val.collect_gene_ids(ids),
            Gpr::GeneNode(gene) => {
                ids.insert(gene.clone());
            }
        }
    }

    /// Whether the rule references a gene
    pub fn contains_gene(&self, gene_id: &str) -> bool {
        match self {
            Gpr::Operation(GprOperation::Or { left, right })
            | Gpr::Operation(GprOperation::And { left, right }) => {
                left.contains_gene(gene_id) || right.contains_gene(gene_id)
            }
            Gpr::Operation(GprOperation::Not { val }) => val.contains_gene(gene_id),
            Gpr::GeneNode(gene) => gene == gene_id,
        }
    }
}

/// Possible operations on genes
#[derive(Clone, Debug, PartialEq)]
pub enum GprOperation {
    Or { left: Box<Gpr>, right: Box<Gpr> },
    And { left: Box<Gpr>, right: Box<Gpr> },
    Not { val: Box<Gpr> },
}

/// Types of Allowed GPR Operations
pub enum GprOperatorType {
    /// Or, results in active if either left or right are active
    Or,
    /// And, results in active if both left and right are active
    And,
    /// Not, results in active if val is inactive
    Not,
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum GprError {
    #[error("Invalid Binary Operation")]
    InvalidBinaryOp,
    #[error("Invalid Unary Operation")]
    InvalidUnaryOp,
    #[error("Gene {0} in GPR is not present in the model")]
    GeneNotFound(String),
    #[error("`not` can't be evaluated as an expression level")]
    NotInExpression,
}

// Model associated functions for working with GPRs
impl Model {
    /// Evaluate whether a GPR evaluates to Active or Inactive
    pub fn eval_gpr(&self, gpr: &Gpr) -> Result<GeneActivity, GprError> {
        self.eval_gpr_without(gpr, None)
    }

    /// Evaluate a GPR with `removed` counted as inactive whatever its current state
    fn eval_gpr_without(&self, gpr: &Gpr, removed: Option<&str>) -> Result<GeneActivity, GprError> {
        match gpr {
            Gpr::Operation(op) => match op {
                GprOperation::Or { left, right } => {
                    let l = self.eval_gpr_without(left, removed)?;
                    let r = self.eval_gpr_without(right, removed)?;
                    if l == GeneActivity::Active || r == GeneActivity::Active {
                        Ok(GeneActivity::Active)
                    } else {
                        Ok(GeneActivity::Inactive)
                    }
                }
                GprOperation::And { left, right } => {
                    let l = self.eval_gpr_without(left, removed)?;
                    let r = self.eval_gpr_without(right, removed)?;
                    if l == GeneActivity::Active && r == GeneActivity::Active {
                        Ok(GeneActivity::Active)
                    } else {
                        Ok(GeneActivity::Inactive)
                    }
                }
                GprOperation::Not { val } => match self.eval_gpr_without(val, removed)? {
                    GeneActivity::Active => Ok(GeneActivity::Inactive),
                    GeneActivity::Inactive => Ok(GeneActivity::Active),
                },
            },
            Gpr::GeneNode(gene) => match self.genes.get(gene) {
                Some(_) if removed == Some(gene.as_str()) => Ok(GeneActivity::Inactive),
                Some(g) => Ok(g.activity),
                None => Err(GprError::GeneNotFound(gene.clone())),
            },
        }
    }
}

// endregion GPR Functionality

#[cfg(test)]
mod gpr_tests {
    use super::*;
    use crate::metabolic_model::gene::GeneBuilder;

    fn setup_model() -> Model {
        let mut model = Model::new_empty();
        // This model only needs to hold genes for these tests
        for (id, activity) in [
            ("active_gene1", GeneActivity::Active),
            ("active_gene2", GeneActivity::Active),
            ("inactive_gene1", GeneActivity::Inactive),
            ("inactive_gene2", GeneActivity::Inactive),
        ] {
            model.add_gene(
                GeneBuilder::default()
                    .id(id.to_string())
                    .activity(activity)
                    .build()
                    .unwrap(),
            );
        }
        model
    }

    fn and(left: &str, right: &str) -> Gpr {
        Gpr::new_binary_operation(
            Gpr::new_gene_node(left),
            GprOperatorType::And,
            Gpr::new_gene_node(right),
        )
        .unwrap()
    }

    fn or(left: &str, right: &str) -> Gpr {
        Gpr::new_binary_operation(
            Gpr::new_gene_node(left),
            GprOperatorType::Or,
            Gpr::new_gene_node(right),
        )
        .unwrap()
    }

    #[test]
    fn gene_node() {
        let model = setup_model();
        assert_eq!(
            model.eval_gpr(&Gpr::new_gene_node("active_gene1")).unwrap(),
            GeneActivity::Active
        );
        assert_eq!(
            model.eval_gpr(&Gpr::new_gene_node("inactive_gene1")).unwrap(),
            GeneActivity::Inactive
        );
        assert_eq!(
            model.eval_gpr(&Gpr::new_gene_node("missing")),
            Err(GprError::GeneNotFound("missing".to_string()))
        );
    }

    #[test]
    fn and_node() {
        let model = setup_model();
        assert_eq!(
            model.eval_gpr(&and("active_gene1", "active_gene2")).unwrap(),
            GeneActivity::Active
        );
        assert_eq!(
            model.eval_gpr(&and("active_gene1", "inactive_gene1")).unwrap(),
            GeneActivity::Inactive
        );
        assert_eq!(
            model
                .eval_gpr(&and("inactive_gene1", "inactive_gene2"))
                .unwrap(),
            GeneActivity::Inactive
        );
    }

    #[test]
    fn or_node() {
        let model = setup_model();
        assert_eq!(
            model.eval_gpr(&or("active_gene1", "active_gene2")).unwrap(),
            GeneActivity::Active
        );
        assert_eq!(
            model.eval_gpr(&or("active_gene1", "inactive_gene1")).unwrap(),
            GeneActivity::Active
        );
        assert_eq!(
            model.eval_gpr(&or("inactive_gene1", "inactive_gene2")).unwrap(),
            GeneActivity::Inactive
        );
    }

    #[test]
    fn not_node() {
        let model = setup_model();
        let not_active =
            Gpr::new_unary_operation(GprOperatorType::Not, Gpr::new_gene_node("active_gene1"))
                .unwrap();
        assert_eq!(model.eval_gpr(&not_active).unwrap(), GeneActivity::Inactive);
        assert!(Gpr::new_unary_operation(GprOperatorType::And, not_active).is_err());
    }

    #[test]
    fn display_and_gene_ids() {
        use crate::io::gpr_parse::parse_gpr;
        let mut gene_map = IndexMap::new();
        let gpr = parse_gpr("(Rv0001 and Rv0002) or Rv0003 or Rv0001", &mut gene_map).unwrap();
        // Display is explicit with parentheses, so the whole expression is wrapped
        assert_eq!(
            format!("{}", gpr),
            "(((Rv0001 and Rv0002) or Rv0003) or Rv0001)"
        );
        assert_eq!(gpr.gene_ids(), vec!["Rv0001", "Rv0002", "Rv0003"]);
        assert!(gpr.contains_gene("Rv0003"));
        assert!(!gpr.contains_gene("Rv0004"));
        assert_eq!(gene_map.len(), 3);
    }
}

#[cfg(test)]
mod model_tests {
    use super::*;
    use crate::test_models::toy_model;

    #[test]
    fn knock_out_isozyme_gene_keeps_reaction() {
        let mut model = toy_model();
        // PDH is catalysed by b_pdh1 or b_pdh2
        let disabled = model.knock_out_gene("b_pdh1").unwrap();
        assert!(disabled.is_empty());
        assert_eq!(model.reactions["PDH"].activity, ReactionActivity::Active);

        let disabled = model.knock_out_gene("b_pdh2").unwrap();
        assert_eq!(disabled, vec!["PDH".to_string()]);
        assert_eq!(model.reactions["PDH"].upper_bound, 0.0);
    }

    #[test]
    fn knock_out_complex_subunit_disables_reaction() {
        let mut model = toy_model();
        let disabled = model.knock_out_gene("b_gly2").unwrap();
        assert_eq!(disabled, vec!["GLYC".to_string()]);
        assert!(model.knock_out_gene("not_a_gene").is_err());
    }

    #[test]
    fn failed_gene_knockout_changes_nothing() {
        let mut model = toy_model();
        // LDH now also refers to a gene the model doesn't have
        model.reactions["LDH"].gpr = Some(
            Gpr::new_binary_operation(
                Gpr::new_gene_node("b_pfl"),
                GprOperatorType::Or,
                Gpr::new_gene_node("ghost"),
            )
            .unwrap(),
        );
        let before = model.bounds_snapshot();
        assert!(matches!(
            model.knock_out_gene("b_pfl"),
            Err(GprError::GeneNotFound(id)) if id == "ghost"
        ));
        assert!(model.genes["b_pfl"].is_active());
        assert_eq!(model.bounds_snapshot(), before);
    }

    #[test]
    fn knock_out_reaction() {
        let mut model = toy_model();
        assert!(model.knock_out_reaction("LDH"));
        assert!(!model.knock_out_reaction("NOPE"));
        let (lb, ub, activity) = model.bounds_snapshot()["LDH"];
        assert_eq!((lb, ub), (0.0, 0.0));
        assert_eq!(activity, ReactionActivity::Inactive);
    }

    #[test]
    fn exchanges_and_objective() {
        let model = toy_model();
        let exchange_ids: Vec<&str> = model.exchanges().map(|r| r.id.as_str()).collect();
        assert!(exchange_ids.contains(&"EX_glc__D_e"));
        assert!(exchange_ids.contains(&"EX_co2_e"));
        assert!(!exchange_ids.contains(&"PDH"));
        assert_eq!(model.objective_reaction_id(), Some("BIOMASS"));
        assert_eq!(
            model.exchange_metabolite("EX_ac_e").map(|m| m.id.as_str()),
            Some("ac_e")
        );
        assert!(model.exchange_metabolite("PDH").is_none());
    }

    #[test]
    fn search() {
        let model = toy_model();
        let hits = model.search("pdh");
        assert_eq!(hits[0].kind, SearchHitKind::Gene);
        assert!(hits
            .iter()
            .any(|h| h.id == "PDH" && h.kind == SearchHitKind::Reaction));
        let hits = model.search("DEHYDROGENASE");
        assert!(hits.iter().all(|h| h.kind == SearchHitKind::Reaction));
        assert!(!hits.is_empty());
        assert!(model.search("zzz_nothing").is_empty());
    }
}
