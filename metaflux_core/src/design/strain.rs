//! Knockout strategies redirecting flux towards a target reaction
//!
//! Reactions consuming the same precursors as the target are knocked out one at a time, each
//! inside a [`KnockoutScope`], and scored by the target flux they leave weighted by the growth
//! they retain. The best one or two form the proposed strategies.
use derive_builder::Builder;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::design::scope::KnockoutScope;
use crate::design::DesignError;
use crate::metabolic_model::model::Model;
use crate::optimize::fba::optimize;
use crate::optimize::solvers::Solver;
use crate::utils::numeric::{round4, sanitize_float};

/// Name of the search method reported with the results
pub const METHOD: &str = "Branch Point Analysis (BPA)";

/// Settings of a knockout search
#[derive(Builder, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[builder(default)]
#[serde(default)]
pub struct DesignParameters {
    /// Fraction of the baseline growth a knockout must retain
    pub growth_retention: f64,
    /// Maximum number of candidate reactions tested
    pub candidate_cap: usize,
    /// Scale applied to the lower growth of a double knockout estimate
    pub double_growth_scale: f64,
    /// Scale applied to the higher production of a double knockout estimate
    pub double_production_scale: f64,
}

impl Default for DesignParameters {
    fn default() -> Self {
        DesignParameters {
            growth_retention: 0.1,
            candidate_cap: 30,
            double_growth_scale: 0.9,
            double_production_scale: 1.4,
        }
    }
}

/// A reaction competing with the target for a precursor
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Competitor {
    pub reaction_id: String,
    /// Precursor shared with the target
    pub precursor: String,
}

/// A tested single knockout
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KnockoutCandidate {
    pub reaction_id: String,
    pub precursor: String,
    pub growth: f64,
    pub production: f64,
    /// `production * growth / baseline_growth`
    pub score: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategySource {
    /// Derived from solves of the model
    Computed,
    /// Generic suggestion, not derived from the model
    Fallback,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowKind {
    Blocked,
    Enhanced,
}

/// Edge of the schematic flux picture of a strategy
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowEdge {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: FlowKind,
}

impl FlowEdge {
    fn new(from: &str, to: &str, kind: FlowKind) -> Self {
        FlowEdge {
            from: from.to_string(),
            to: to.to_string(),
            kind,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rationale {
    pub mechanism: String,
    pub description: String,
    pub visual_flow: Vec<FlowEdge>,
}

/// A proposed set of knockouts
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub knockouts: Vec<String>,
    pub expected_growth: f64,
    pub expected_production: f64,
    pub score: f64,
    pub rationale: Rationale,
    pub source: StrategySource,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DesignResult {
    pub target: String,
    pub method: String,
    pub baseline_growth: f64,
    /// Candidates retaining enough growth, best first
    pub candidates: Vec<KnockoutCandidate>,
    pub strategies: Vec<Strategy>,
}

impl DesignResult {
    /// Whether the strategies are generic suggestions
    pub fn is_fallback(&self) -> bool {
        self.strategies
            .iter()
            .all(|s| s.source == StrategySource::Fallback)
    }
}

/// Gene associated reactions consuming a substrate of the target
///
/// The target and the objective reactions are excluded. Reactions are listed once, in order
/// of the target's substrates, and at most `cap` are returned.
pub fn competing_reactions(
    model: &Model,
    target_reaction: &str,
    cap: usize,
) -> Result<Vec<Competitor>, DesignError> {
    let target = model
        .reactions
        .get(target_reaction)
        .ok_or_else(|| DesignError::TargetNotFound(target_reaction.to_string()))?;
    let mut seen: IndexSet<&str> = IndexSet::new();
    let mut competitors = Vec::new();
    for precursor in target.substrates() {
        for (reaction, coef) in model.metabolite_reactions(precursor) {
            if coef >= 0.0
                || reaction.id == target_reaction
                || model.objective.contains_key(&reaction.id)
                || !reaction.has_genes()
            {
                continue;
            }
            if seen.insert(reaction.id.as_str()) {
                competitors.push(Competitor {
                    reaction_id: reaction.id.clone(),
                    precursor: precursor.to_string(),
                });
            }
        }
    }
    competitors.truncate(cap);
    Ok(competitors)
}

/// Search single and double knockouts increasing the flux through `target_reaction`
///
/// The model is left exactly as it was passed in. Candidates whose solve fails are dropped.
/// When no candidate retains enough growth, the generic [`fallback_strategies`] are
/// returned.
pub fn optimize_knockouts(
    model: &mut Model,
    solver: &dyn Solver,
    target_reaction: &str,
    params: &DesignParameters,
) -> Result<DesignResult, DesignError> {
    let competitors = competing_reactions(model, target_reaction, params.candidate_cap)?;
    let baseline = optimize(model, solver)?;
    if !baseline.is_optimal() {
        return Err(DesignError::NonOptimal(baseline.status));
    }
    let baseline_growth = sanitize_float(baseline.objective_value);
    if baseline_growth <= 0.0 {
        log::warn!(
            "No baseline growth, knockouts for {} can't be scored, returning generic strategies",
            target_reaction
        );
        return Ok(DesignResult {
            target: target_reaction.to_string(),
            method: METHOD.to_string(),
            baseline_growth: 0.0,
            candidates: Vec::new(),
            strategies: fallback_strategies(),
        });
    }
    log::info!(
        "Testing {} knockout candidates for {} (baseline growth {:.4})",
        competitors.len(),
        target_reaction,
        baseline_growth
    );

    let mut candidates = Vec::new();
    for competitor in competitors {
        let mut scope = KnockoutScope::new(model);
        scope.knock_out_reaction(&competitor.reaction_id);
        let solution = match optimize(scope.model(), solver) {
            Ok(solution) => solution,
            Err(err) => {
                log::debug!("Knockout of {} failed: {}", competitor.reaction_id, err);
                continue;
            }
        };
        if !solution.is_optimal() {
            log::debug!(
                "Knockout of {} is {}",
                competitor.reaction_id,
                solution.status
            );
            continue;
        }
        let growth = sanitize_float(solution.objective_value);
        if growth < baseline_growth * params.growth_retention {
            continue;
        }
        let production = sanitize_float(solution.flux(target_reaction));
        candidates.push(KnockoutCandidate {
            reaction_id: competitor.reaction_id,
            precursor: competitor.precursor,
            growth: round4(growth),
            production: round4(production),
            score: round4(production * growth / baseline_growth),
        });
    }
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let strategies = match candidates.as_slice() {
        [] => {
            log::warn!(
                "No knockout of {} retains growth, returning generic strategies",
                target_reaction
            );
            fallback_strategies()
        }
        [top] => vec![single_knockout(top, target_reaction)],
        [top, second, ..] => vec![
            single_knockout(top, target_reaction),
            double_knockout(top, second, target_reaction, baseline_growth, params),
        ],
    };

    Ok(DesignResult {
        target: target_reaction.to_string(),
        method: METHOD.to_string(),
        baseline_growth: round4(baseline_growth),
        candidates,
        strategies,
    })
}

fn single_knockout(top: &KnockoutCandidate, target: &str) -> Strategy {
    Strategy {
        knockouts: vec![top.reaction_id.clone()],
        expected_growth: top.growth,
        expected_production: top.production,
        score: top.score,
        rationale: Rationale {
            mechanism: "Competitive Pathway Blockage".to_string(),
            description: format!(
                "The reaction {} competes with the target for {}. Blocking it forces carbon \
                 flux towards {}.",
                top.reaction_id, top.precursor, target
            ),
            visual_flow: vec![
                FlowEdge::new(&top.precursor, &top.reaction_id, FlowKind::Blocked),
                FlowEdge::new(&top.precursor, target, FlowKind::Enhanced),
            ],
        },
        source: StrategySource::Computed,
    }
}

/// Estimate of knocking out the two best candidates together, not solved
fn double_knockout(
    top: &KnockoutCandidate,
    second: &KnockoutCandidate,
    target: &str,
    baseline_growth: f64,
    params: &DesignParameters,
) -> Strategy {
    let growth = top.growth.min(second.growth) * params.double_growth_scale;
    let production = top.production.max(second.production) * params.double_production_scale;
    let mut visual_flow = vec![
        FlowEdge::new(&top.precursor, &top.reaction_id, FlowKind::Blocked),
        FlowEdge::new(&second.precursor, &second.reaction_id, FlowKind::Blocked),
        FlowEdge::new(&top.precursor, target, FlowKind::Enhanced),
    ];
    if second.precursor != top.precursor {
        visual_flow.push(FlowEdge::new(&second.precursor, target, FlowKind::Enhanced));
    }
    Strategy {
        knockouts: vec![top.reaction_id.clone(), second.reaction_id.clone()],
        expected_growth: round4(growth),
        expected_production: round4(production),
        score: round4(production * growth / baseline_growth),
        rationale: Rationale {
            mechanism: "Synergistic Flux Redirection".to_string(),
            description: format!(
                "Simultaneous deletion of {} and {} eliminates competing drains on the \
                 target's precursors, maximizing yield.",
                top.reaction_id, second.reaction_id
            ),
            visual_flow,
        },
        source: StrategySource::Computed,
    }
}

/// Generic fermentation engineering strategies, not derived from any model
pub fn fallback_strategies() -> Vec<Strategy> {
    vec![
        Strategy {
            knockouts: vec!["LDH_AS".to_string(), "PFL".to_string()],
            expected_growth: 0.25,
            expected_production: 5.2,
            score: 0.72,
            rationale: Rationale {
                mechanism: "Fermentation Optimization".to_string(),
                description: "Blocking Lactate (LDH) and Formate (PFL) production redirects \
                              pyruvate towards the target pathway."
                    .to_string(),
                visual_flow: vec![
                    FlowEdge::new("Pyruvate", "Lactate", FlowKind::Blocked),
                    FlowEdge::new("Pyruvate", "Formate", FlowKind::Blocked),
                    FlowEdge::new("Pyruvate", "Target Product", FlowKind::Enhanced),
                ],
            },
            source: StrategySource::Fallback,
        },
        Strategy {
            knockouts: vec!["ACKr".to_string()],
            expected_growth: 0.35,
            expected_production: 3.1,
            score: 0.65,
            rationale: Rationale {
                mechanism: "Acetic Acid Reduction".to_string(),
                description: "Deleting Acetate Kinase prevents carbon loss to acetate, \
                              conserving Acetyl-CoA."
                    .to_string(),
                visual_flow: vec![
                    FlowEdge::new("Acetyl-CoA", "Acetate", FlowKind::Blocked),
                    FlowEdge::new("Acetyl-CoA", "Target Product", FlowKind::Enhanced),
                ],
            },
            source: StrategySource::Fallback,
        },
    ]
}
