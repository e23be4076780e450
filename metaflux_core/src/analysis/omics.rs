//! Map gene expression levels onto reaction flux bounds
//!
//! A rule is evaluated as an expression level: `and` takes the minimum of its operands (every
//! subunit is needed) and `or` their sum (isozymes add up).
use indexmap::IndexMap;
use thiserror::Error;

use crate::io::gpr_parse::{parse_gpr_standalone, GprParseError};
use crate::metabolic_model::model::{Gpr, GprError, GprOperation, Model};

/// Expression level assumed for genes missing from the expression data
pub const UNKNOWN_GENE_EXPRESSION: f64 = 0.01;

/// Expression level of a parsed rule
///
/// `not` has no meaning as an expression level and results in
/// [`GprError::NotInExpression`].
pub fn expression_level(gpr: &Gpr, expression: &IndexMap<String, f64>) -> Result<f64, GprError> {
    match gpr {
        Gpr::Operation(GprOperation::Or { left, right }) => {
            Ok(expression_level(left, expression)? + expression_level(right, expression)?)
        }
        Gpr::Operation(GprOperation::And { left, right }) => Ok(expression_level(left, expression)?
            .min(expression_level(right, expression)?)),
        Gpr::Operation(GprOperation::Not { .. }) => Err(GprError::NotInExpression),
        Gpr::GeneNode(gene) => Ok(expression
            .get(gene)
            .copied()
            .unwrap_or(UNKNOWN_GENE_EXPRESSION)),
    }
}

/// Expression level of a rule string, a blank rule has level 0
///
/// # Examples
/// ```rust
/// use indexmap::IndexMap;
/// use metaflux_core::analysis::omics::evaluate_rule;
/// let mut expression = IndexMap::new();
/// expression.insert("G1".to_string(), 5.0);
/// expression.insert("G2".to_string(), 3.0);
/// expression.insert("G3".to_string(), 0.0);
/// assert_eq!(evaluate_rule("(G1 and G2) or G3", &expression).unwrap(), 3.0);
/// ```
pub fn evaluate_rule(rule: &str, expression: &IndexMap<String, f64>) -> Result<f64, OmicsError> {
    match parse_gpr_standalone(rule)? {
        Some(gpr) => Ok(expression_level(&gpr, expression)?),
        None => Ok(0.0),
    }
}

/// Expression level of every reaction with a gene rule, keyed by reaction id
///
/// Reactions whose level is not positive are left out, as are reactions whose rule can't be
/// evaluated (logged at debug level).
pub fn reaction_expression(model: &Model, expression: &IndexMap<String, f64>) -> IndexMap<String, f64> {
    let mut levels = IndexMap::new();
    for reaction in model.reactions.values() {
        let level = match (&reaction.gpr, &reaction.unparsed_rule) {
            (Some(gpr), _) => expression_level(gpr, expression).map_err(OmicsError::from),
            (None, Some(rule)) => evaluate_rule(rule, expression),
            (None, None) => continue,
        };
        match level {
            Ok(level) if level > 0.0 => {
                levels.insert(reaction.id.clone(), level);
            }
            Ok(_) => {}
            Err(err) => log::debug!("Skipping expression of {}: {}", reaction.id, err),
        }
    }
    levels
}

/// Tighten the bounds of every expressed reaction to `level * normalization_factor`
///
/// A positive upper bound becomes `min(upper, bound)`, a negative lower bound
/// `max(lower, -bound)`; bounds are never loosened. Returns the applied bound per reaction.
pub fn apply_expression(
    model: &mut Model,
    expression: &IndexMap<String, f64>,
    normalization_factor: f64,
) -> IndexMap<String, f64> {
    let levels = reaction_expression(model, expression);
    let mut applied = IndexMap::with_capacity(levels.len());
    for (id, level) in levels {
        let bound = level * normalization_factor;
        if !bound.is_finite() {
            log::warn!("Ignoring non finite expression bound for {}", id);
            continue;
        }
        let Some(reaction) = model.reactions.get_mut(&id) else {
            continue;
        };
        if reaction.upper_bound > 0.0 {
            reaction.upper_bound = reaction.upper_bound.min(bound);
        }
        if reaction.lower_bound < 0.0 {
            reaction.lower_bound = reaction.lower_bound.max(-bound);
        }
        applied.insert(id, bound);
    }
    log::info!("Applied expression constraints to {} reactions", applied.len());
    applied
}

#[derive(Error, Debug)]
pub enum OmicsError {
    #[error("Unable to parse gene rule: {0}")]
    Parse(#[from] GprParseError),
    #[error("Unable to evaluate gene rule: {0}")]
    Evaluation(#[from] GprError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabolic_model::reaction::ReactionBuilder;
    use crate::test_models::toy_model;

    fn levels(values: &[(&str, f64)]) -> IndexMap<String, f64> {
        values.iter().map(|(id, v)| (id.to_string(), *v)).collect()
    }

    #[test]
    fn and_is_min_or_is_sum() {
        let expression = levels(&[("G1", 5.0), ("G2", 3.0), ("G3", 0.0)]);
        assert_eq!(evaluate_rule("(G1 and G2) or G3", &expression).unwrap(), 3.0);
        assert_eq!(evaluate_rule("G1 or G2 or G3", &expression).unwrap(), 8.0);
        assert_eq!(evaluate_rule("G1 and (G2 or G3)", &expression).unwrap(), 3.0);
        assert_eq!(evaluate_rule("G1 and G3", &expression).unwrap(), 0.0);
    }

    #[test]
    fn unknown_genes_default_to_small_value() {
        let expression = levels(&[("G1", 5.0)]);
        assert_eq!(
            evaluate_rule("G1 and G2", &expression).unwrap(),
            UNKNOWN_GENE_EXPRESSION
        );
        assert_eq!(evaluate_rule("G2 OR G4", &expression).unwrap(), 0.02);
    }

    #[test]
    fn blank_and_malformed_rules() {
        let expression = levels(&[("G1", 5.0)]);
        assert_eq!(evaluate_rule("  ", &expression).unwrap(), 0.0);
        assert!(matches!(
            evaluate_rule("(G1 and", &expression),
            Err(OmicsError::Parse(_))
        ));
        assert!(matches!(
            evaluate_rule("not G1", &expression),
            Err(OmicsError::Evaluation(GprError::NotInExpression))
        ));
    }

    #[test]
    fn reaction_levels() {
        let model = toy_model();
        let expression = levels(&[
            ("b_gly1", 4.0),
            ("b_gly2", 6.0),
            ("b_pdh1", 2.0),
            ("b_pdh2", 1.5),
            ("b_ldh", 0.0),
        ]);
        let mapped = reaction_expression(&model, &expression);
        assert_eq!(mapped["GLYC"], 4.0);
        assert_eq!(mapped["PDH"], 3.5);
        assert_eq!(mapped["PFL"], UNKNOWN_GENE_EXPRESSION);
        assert!(!mapped.contains_key("LDH"));
        assert!(!mapped.contains_key("EX_glc__D_e"));
    }

    #[test]
    fn bounds_only_tighten() {
        let mut model = toy_model();
        let mut gpr_genes = IndexMap::new();
        let gpr = crate::io::gpr_parse::parse_gpr("b_rev", &mut gpr_genes).unwrap();
        model.add_reaction(
            ReactionBuilder::default()
                .id("REV".to_string())
                .lower_bound(-3.0)
                .upper_bound(3.0)
                .gpr(Some(gpr))
                .build()
                .unwrap(),
        );
        let expression = levels(&[("b_pdh1", 2.0), ("b_pdh2", 1.0), ("b_rev", 5.0)]);
        let applied = apply_expression(&mut model, &expression, 2.0);
        assert_eq!(applied["PDH"], 6.0);
        assert_eq!(model.reactions["PDH"].upper_bound, 6.0);
        assert_eq!(model.reactions["PDH"].lower_bound, 0.0);
        // bound 10 is looser than the existing +-3
        assert_eq!(model.reactions["REV"].upper_bound, 3.0);
        assert_eq!(model.reactions["REV"].lower_bound, -3.0);
        // unlisted gene, 0.01 * 2
        assert!((model.reactions["LDH"].upper_bound - 0.02).abs() < 1e-12);
    }
}
