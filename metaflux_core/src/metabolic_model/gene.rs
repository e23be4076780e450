//! This module provides the Gene struct, representing a gene which can be knocked out
use std::fmt::{Display, Formatter};
use std::hash::Hash;

use derive_builder::Builder;

/// Structure Representing a Gene
#[derive(Builder, Clone, Debug, Eq, PartialEq)]
pub struct Gene {
    /// Used to identify the gene
    pub id: String,
    /// Human Readable Gene Name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Whether this gene is currently active (see [`GeneActivity`])
    #[builder(default = "GeneActivity::Active")]
    pub activity: GeneActivity,
    /// Notes about the gene
    #[builder(default = "None")]
    pub notes: Option<String>,
    /// Gene Annotations
    #[builder(default = "None")]
    pub annotation: Option<String>,
}

impl Gene {
    /// Create a new active gene with only an id and optional name
    pub fn new(id: &str, name: Option<&str>) -> Gene {
        Gene {
            id: id.to_string(),
            name: name.map(|n| n.to_string()),
            activity: GeneActivity::Active,
            notes: None,
            annotation: None,
        }
    }

    /// Mark the gene as knocked out
    pub fn knock_out(&mut self) {
        self.activity = GeneActivity::Inactive;
    }

    /// Whether the gene is currently functional
    pub fn is_active(&self) -> bool {
        self.activity == GeneActivity::Active
    }
}

impl Display for Gene {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl Hash for Gene {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.activity.hash(state);
    }
}

/// Whether a gene is active or not
#[derive(Clone, Debug, Hash, Eq, PartialEq, Copy)]
pub enum GeneActivity {
    /// Gene is considered active
    Active,
    /// Gene is considered inactive
    Inactive,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let gene = GeneBuilder::default()
            .id("b0001".to_string())
            .build()
            .unwrap();
        assert_eq!(gene.activity, GeneActivity::Active);
        assert!(gene.name.is_none());
        assert_eq!(format!("{}", gene), "b0001");
    }

    #[test]
    fn knock_out() {
        let mut gene = Gene::new("b0001", Some("thrL"));
        assert!(gene.is_active());
        gene.knock_out();
        assert!(!gene.is_active());
        assert_eq!(gene.name.unwrap(), "thrL");
    }
}
