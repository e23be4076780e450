//! Temporary knockouts which are undone when the scope ends
use indexmap::IndexMap;

use crate::metabolic_model::gene::GeneActivity;
use crate::metabolic_model::model::{GprError, Model};
use crate::metabolic_model::reaction::ReactionActivity;

/// Knockouts applied through the scope are rolled back when it is dropped
///
/// Only the state of touched genes and reactions is saved, the first time they are touched.
/// Rollback happens on every exit path, including early returns and unwinding.
///
/// # Examples
/// ```rust
/// use metaflux_core::design::scope::KnockoutScope;
/// use metaflux_core::metabolic_model::model::Model;
/// use metaflux_core::metabolic_model::reaction::ReactionBuilder;
/// let mut model = Model::new_empty();
/// model.add_reaction(ReactionBuilder::default().id("R1".to_string()).build().unwrap());
/// {
///     let mut scope = KnockoutScope::new(&mut model);
///     scope.knock_out_reaction("R1");
///     assert_eq!(scope.model().reactions["R1"].upper_bound, 0.0);
/// }
/// assert_eq!(model.reactions["R1"].upper_bound, 1000.0);
/// ```
pub struct KnockoutScope<'m> {
    model: &'m mut Model,
    reactions: IndexMap<String, (f64, f64, ReactionActivity)>,
    genes: IndexMap<String, GeneActivity>,
}

impl<'m> KnockoutScope<'m> {
    pub fn new(model: &'m mut Model) -> Self {
        KnockoutScope {
            model,
            reactions: IndexMap::new(),
            genes: IndexMap::new(),
        }
    }

    /// The model with the scoped knockouts applied
    pub fn model(&self) -> &Model {
        &*self.model
    }

    fn save_reaction(&mut self, reaction_id: &str) {
        if self.reactions.contains_key(reaction_id) {
            return;
        }
        if let Some(reaction) = self.model.reactions.get(reaction_id) {
            self.reactions.insert(
                reaction_id.to_string(),
                (reaction.lower_bound, reaction.upper_bound, reaction.activity),
            );
        }
    }

    /// Knock out a reaction, returns false if it doesn't exist
    pub fn knock_out_reaction(&mut self, reaction_id: &str) -> bool {
        self.save_reaction(reaction_id);
        self.model.knock_out_reaction(reaction_id)
    }

    /// Knock out a gene and the reactions depending on it
    pub fn knock_out_gene(&mut self, gene_id: &str) -> Result<Vec<String>, GprError> {
        let activity = match self.model.genes.get(gene_id) {
            Some(gene) => gene.activity,
            None => return Err(GprError::GeneNotFound(gene_id.to_string())),
        };
        self.genes.entry(gene_id.to_string()).or_insert(activity);
        let dependent: Vec<String> = self
            .model
            .reactions
            .values()
            .filter(|r| r.gpr.as_ref().is_some_and(|gpr| gpr.contains_gene(gene_id)))
            .map(|r| r.id.clone())
            .collect();
        for id in &dependent {
            self.save_reaction(id);
        }
        self.model.knock_out_gene(gene_id)
    }

    /// Undo every knockout made through the scope, the scope stays usable
    pub fn restore(&mut self) {
        for (id, (lower, upper, activity)) in self.reactions.drain(..) {
            if let Some(reaction) = self.model.reactions.get_mut(&id) {
                reaction.lower_bound = lower;
                reaction.upper_bound = upper;
                reaction.activity = activity;
            }
        }
        for (id, activity) in self.genes.drain(..) {
            if let Some(gene) = self.model.genes.get_mut(&id) {
                gene.activity = activity;
            }
        }
    }
}

impl Drop for KnockoutScope<'_> {
    fn drop(&mut self) {
        self.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_models::toy_model;

    #[test]
    fn reaction_knockout_is_rolled_back() {
        let mut model = toy_model();
        let before = model.bounds_snapshot();
        {
            let mut scope = KnockoutScope::new(&mut model);
            assert!(scope.knock_out_reaction("PDH"));
            assert!(scope.knock_out_reaction("PDH"));
            assert!(!scope.knock_out_reaction("NOPE"));
            assert_eq!(scope.model().reactions["PDH"].upper_bound, 0.0);
        }
        assert_eq!(model.bounds_snapshot(), before);
    }

    #[test]
    fn gene_knockout_is_rolled_back() {
        let mut model = toy_model();
        let before = model.bounds_snapshot();
        {
            let mut scope = KnockoutScope::new(&mut model);
            assert!(scope.knock_out_gene("b_pdh1").unwrap().is_empty());
            assert_eq!(scope.knock_out_gene("b_pdh2").unwrap(), vec!["PDH".to_string()]);
            assert!(!scope.model().genes["b_pdh1"].is_active());
            assert!(scope.knock_out_gene("missing").is_err());
        }
        assert_eq!(model.bounds_snapshot(), before);
        assert!(model.genes.values().all(|g| g.is_active()));
    }

    #[test]
    fn rollback_on_early_return() {
        fn knock_out_then_fail(model: &mut Model) -> Result<(), GprError> {
            let mut scope = KnockoutScope::new(model);
            scope.knock_out_reaction("LDH");
            scope.knock_out_gene("missing")?;
            Ok(())
        }
        let mut model = toy_model();
        let before = model.bounds_snapshot();
        assert!(knock_out_then_fail(&mut model).is_err());
        assert_eq!(model.bounds_snapshot(), before);
    }

    #[test]
    fn explicit_restore() {
        let mut model = toy_model();
        let mut scope = KnockoutScope::new(&mut model);
        scope.knock_out_reaction("LDH");
        scope.restore();
        assert_eq!(scope.model().reactions["LDH"].upper_bound, 1000.0);
        scope.knock_out_reaction("PFL");
        assert_eq!(scope.model().reactions["PFL"].upper_bound, 0.0);
        drop(scope);
        assert_eq!(model.reactions["PFL"].upper_bound, 1000.0);
    }
}
