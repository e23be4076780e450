//! Summaries of a single flux solution
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::analysis::byproduct::{ByproductDatabase, ByproductImpact};
use crate::configuration::tolerance;
use crate::metabolic_model::model::Model;
use crate::optimize::fba::FluxSolution;
use crate::optimize::{OptimizationStatus, OptimizeError};
use crate::utils::numeric::{round_to, safe_ratio, sanitize_float};

/// Tunables of [`analyze_solution`]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SolutionAnalysisSettings {
    /// Number of excreted exchanges reported as byproducts
    pub byproduct_count: usize,
    /// Number of shadow prices reported, largest magnitude first
    pub shadow_price_count: usize,
    /// Excretion flux above which a byproduct is passed to the impact analysis
    pub impact_threshold: f64,
    /// Metabolite whose carbon is an unavoidable loss, not counted as waste
    pub inevitable_loss: String,
}

impl Default for SolutionAnalysisSettings {
    fn default() -> Self {
        SolutionAnalysisSettings {
            byproduct_count: 5,
            shadow_price_count: 50,
            impact_threshold: 1e-4,
            inevitable_loss: "co2_e".to_string(),
        }
    }
}

/// An exchange flux, keyed by reaction id
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExchangeFlux {
    pub id: String,
    pub value: f64,
}

/// Post processed flux solution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StaticAnalysis {
    pub status: OptimizationStatus,
    pub growth_rate: f64,
    pub fluxes: IndexMap<String, f64>,
    /// Largest excretion fluxes, descending
    pub byproducts: Vec<ExchangeFlux>,
    /// Percent of the carbon taken up which leaves as organic byproducts
    pub carbon_loss_index: f64,
    /// Metabolite id to shadow price, largest magnitude first
    pub shadow_prices: IndexMap<String, f64>,
    pub byproduct_analysis: Vec<ByproductImpact>,
}

/// Summarize an optimal flux solution
///
/// A non-optimal solution is an error carrying its status. Failures of the individual metrics
/// are logged and replaced by an empty value.
pub fn analyze_solution(
    model: &Model,
    solution: &FluxSolution,
    database: &ByproductDatabase,
    settings: &SolutionAnalysisSettings,
) -> Result<StaticAnalysis, OptimizeError> {
    if !solution.is_optimal() {
        return Err(OptimizeError::NonOptimal(solution.status));
    }
    let fluxes: IndexMap<String, f64> = solution
        .fluxes
        .iter()
        .map(|(id, flux)| (id.clone(), sanitize_float(*flux)))
        .collect();

    let carbon_loss_index = round_to(carbon_loss_index(model, &fluxes, &settings.inevitable_loss), 2);

    let production = excretion_by_metabolite(model, &fluxes, settings.impact_threshold);
    Ok(StaticAnalysis {
        status: solution.status,
        growth_rate: sanitize_float(solution.objective_value),
        byproducts: top_byproducts(model, &fluxes, settings.byproduct_count),
        carbon_loss_index,
        shadow_prices: top_shadow_prices(solution.shadow_prices.as_ref(), settings.shadow_price_count),
        byproduct_analysis: database.analyze_impact(&production),
        fluxes,
    })
}

/// Largest `count` exchange fluxes above the exchange tolerance, descending
pub fn top_byproducts(model: &Model, fluxes: &IndexMap<String, f64>, count: usize) -> Vec<ExchangeFlux> {
    let tolerance = tolerance();
    let mut excreted: Vec<ExchangeFlux> = model
        .exchanges()
        .filter_map(|r| {
            let value = sanitize_float(fluxes.get(&r.id).copied().unwrap_or(0.0));
            (value > tolerance).then(|| ExchangeFlux {
                id: r.id.clone(),
                value,
            })
        })
        .collect();
    excreted.sort_by(|a, b| b.value.total_cmp(&a.value));
    excreted.truncate(count);
    excreted
}

/// Percentage of carbon taken up that is excreted, not counting `inevitable_loss`
///
/// Uptake is any exchange flux below `-tolerance`, excretion any above `tolerance`, each
/// weighted by the carbon atoms of the exchanged metabolite. 0 when no carbon is taken up.
/// A metabolite whose formula can't be parsed counts as carbon free.
pub fn carbon_loss_index(
    model: &Model,
    fluxes: &IndexMap<String, f64>,
    inevitable_loss: &str,
) -> f64 {
    let tolerance = tolerance();
    let mut uptake = 0.0;
    let mut excreted = 0.0;
    for reaction in model.exchanges() {
        let flux = sanitize_float(fluxes.get(&reaction.id).copied().unwrap_or(0.0));
        let Some(metabolite) = model.exchange_metabolite(&reaction.id) else {
            continue;
        };
        // exchange reactions consume their metabolite, a negative flux is an uptake
        if flux.abs() <= tolerance {
            continue;
        }
        let carbon = match metabolite.carbon_atoms() {
            Ok(carbon) => carbon,
            Err(err) => {
                log::warn!("Counting {} as carbon free: {}", metabolite.id, err);
                0.0
            }
        };
        if flux < 0.0 {
            uptake += flux.abs() * carbon;
        } else if metabolite.id != inevitable_loss {
            excreted += flux * carbon;
        }
    }
    safe_ratio(excreted, uptake) * 100.0
}

/// Excretion fluxes above `threshold`, keyed by the exchanged metabolite id
///
/// Exchanges whose metabolite isn't in the model keep their reaction id.
pub fn excretion_by_metabolite(
    model: &Model,
    fluxes: &IndexMap<String, f64>,
    threshold: f64,
) -> IndexMap<String, f64> {
    model
        .exchanges()
        .filter_map(|reaction| {
            let flux = sanitize_float(fluxes.get(&reaction.id).copied().unwrap_or(0.0));
            if flux <= threshold {
                return None;
            }
            let key = model
                .exchange_metabolite(&reaction.id)
                .map(|m| m.id.clone())
                .unwrap_or_else(|| reaction.id.clone());
            Some((key, flux))
        })
        .collect()
}

/// Largest `count` shadow prices by magnitude, empty without dual values
pub fn top_shadow_prices(
    shadow_prices: Option<&IndexMap<String, f64>>,
    count: usize,
) -> IndexMap<String, f64> {
    let Some(prices) = shadow_prices else {
        return IndexMap::new();
    };
    let mut sorted: Vec<(&String, f64)> = prices
        .iter()
        .map(|(id, price)| (id, sanitize_float(*price)))
        .collect();
    sorted.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
    sorted
        .into_iter()
        .take(count)
        .map(|(id, price)| (id.clone(), price))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::fba::optimize;
    use crate::optimize::solvers::clarabel::ClarabelSolver;
    use crate::test_models::toy_model;

    fn analyze(model: &Model) -> StaticAnalysis {
        let solution = optimize(model, &ClarabelSolver::default()).unwrap();
        analyze_solution(
            model,
            &solution,
            &ByproductDatabase::default(),
            &SolutionAnalysisSettings::default(),
        )
        .unwrap()
    }

    #[test]
    fn aerobic_wild_type() {
        let model = toy_model();
        let analysis = analyze(&model);
        assert!((analysis.growth_rate - 2.0).abs() < 1e-4);
        assert_eq!(analysis.byproducts.len(), 1);
        assert_eq!(analysis.byproducts[0].id, "EX_co2_e");
        // all carbon leaves as CO2 or biomass
        assert!(analysis.carbon_loss_index.abs() < 1e-2);
        assert!(!analysis.shadow_prices.is_empty());
        assert!(analysis.shadow_prices.len() <= 50);
        let impacts: Vec<&str> = analysis
            .byproduct_analysis
            .iter()
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(impacts, vec!["co2_e"]);
    }

    #[test]
    fn anaerobic_formate_loss() {
        let mut model = toy_model();
        model.reactions["EX_o2_e"].lower_bound = 0.0;
        let analysis = analyze(&model);
        assert!((analysis.growth_rate - 1.0).abs() < 1e-4);
        assert_eq!(analysis.byproducts[0].id, "EX_for_e");
        // 20 formate carbons out of 60 glucose carbons
        assert!((analysis.carbon_loss_index - 33.33).abs() < 0.02);
        assert_eq!(analysis.byproduct_analysis[0].id, "for_e");
    }

    #[test]
    fn non_optimal_is_an_error() {
        let model = toy_model();
        let solution = FluxSolution {
            status: OptimizationStatus::Infeasible,
            objective_value: 0.0,
            fluxes: IndexMap::new(),
            shadow_prices: None,
        };
        let result = analyze_solution(
            &model,
            &solution,
            &ByproductDatabase::default(),
            &SolutionAnalysisSettings::default(),
        );
        assert!(matches!(
            result,
            Err(OptimizeError::NonOptimal(OptimizationStatus::Infeasible))
        ));
    }

    #[test]
    fn non_finite_values_are_sanitized() {
        let model = toy_model();
        let mut fluxes = IndexMap::new();
        fluxes.insert("EX_glc__D_e".to_string(), f64::NAN);
        fluxes.insert("EX_ac_e".to_string(), f64::INFINITY);
        let solution = FluxSolution {
            status: OptimizationStatus::Optimal,
            objective_value: f64::NAN,
            fluxes,
            shadow_prices: None,
        };
        let analysis = analyze_solution(
            &model,
            &solution,
            &ByproductDatabase::default(),
            &SolutionAnalysisSettings::default(),
        )
        .unwrap();
        assert_eq!(analysis.growth_rate, 0.0);
        assert_eq!(analysis.fluxes["EX_ac_e"], 0.0);
        assert_eq!(analysis.carbon_loss_index, 0.0);
        assert!(analysis.byproducts.is_empty());
        assert!(analysis.shadow_prices.is_empty());
    }

    #[test]
    fn carbon_loss_without_uptake_is_zero() {
        let model = toy_model();
        let mut fluxes = IndexMap::new();
        fluxes.insert("EX_ac_e".to_string(), 3.0);
        assert_eq!(carbon_loss_index(&model, &fluxes, "co2_e"), 0.0);
    }

    #[test]
    fn unparseable_formula_counts_as_carbon_free() {
        let mut model = toy_model();
        model.metabolites["ac_e"].formula = Some("C2(H3)".to_string());
        let mut fluxes = IndexMap::new();
        fluxes.insert("EX_glc__D_e".to_string(), -10.0);
        fluxes.insert("EX_ac_e".to_string(), 3.0);
        fluxes.insert("EX_lac__L_e".to_string(), 5.0);
        // 15 lactate carbons out of 60 glucose carbons, acetate ignored
        let index = carbon_loss_index(&model, &fluxes, "co2_e");
        assert!((index - 25.0).abs() < 1e-9);
    }

    #[test]
    fn byproducts_are_capped_and_sorted() {
        let model = toy_model();
        let fluxes: IndexMap<String, f64> = [
            ("EX_ac_e", 1.0),
            ("EX_for_e", 4.0),
            ("EX_lac__L_e", 2.0),
            ("EX_co2_e", 3.0),
            ("EX_o2_e", 5.0),
            ("EX_glc__D_e", 6.0),
        ]
        .into_iter()
        .map(|(id, v)| (id.to_string(), v))
        .collect();
        let top = top_byproducts(&model, &fluxes, 5);
        let ids: Vec<&str> = top.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["EX_glc__D_e", "EX_o2_e", "EX_for_e", "EX_co2_e", "EX_lac__L_e"]
        );
    }

    #[test]
    fn shadow_prices_by_magnitude() {
        let prices: IndexMap<String, f64> = [("a", 0.5), ("b", -2.0), ("c", 1.0), ("d", f64::NAN)]
            .into_iter()
            .map(|(id, v)| (id.to_string(), v))
            .collect();
        let top = top_shadow_prices(Some(&prices), 2);
        assert_eq!(top.keys().collect::<Vec<_>>(), vec!["b", "c"]);
        assert_eq!(top["b"], -2.0);
        assert!(top_shadow_prices(None, 50).is_empty());
    }
}
