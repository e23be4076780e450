//! Module providing representation of optimization problem variables
use std::fmt::{Display, Formatter};

use derive_builder::Builder;

/// A continuous variable of an optimization problem
#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(setter(into))]
pub struct Variable {
    /// Used to identify the variable, must be unique within a problem
    pub id: String,
    /// Optional human readable name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Lowest value the variable can take (may be -inf)
    #[builder(default = "f64::NEG_INFINITY")]
    pub lower_bound: f64,
    /// Highest value the variable can take (may be inf)
    #[builder(default = "f64::INFINITY")]
    pub upper_bound: f64,
    /// Position of the variable within the problem, set when it is added
    #[builder(setter(skip), default = "0")]
    pub(crate) index: usize,
}

impl Variable {
    /// Whether the bounds pin the variable to a single value
    pub fn is_fixed(&self) -> bool {
        (self.upper_bound - self.lower_bound).abs() < 1e-12
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}[{}, {}]", name, self.lower_bound, self.upper_bound),
            None => write!(f, "{}[{}, {}]", self.id, self.lower_bound, self.upper_bound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let x = VariableBuilder::default().id("x").build().unwrap();
        assert_eq!(x.lower_bound, f64::NEG_INFINITY);
        assert_eq!(x.upper_bound, f64::INFINITY);
        assert!(!x.is_fixed());
        assert_eq!(format!("{}", x), "x[-inf, inf]");
    }

    #[test]
    fn fixed() {
        let x = VariableBuilder::default()
            .id("x")
            .lower_bound(0.)
            .upper_bound(0.)
            .build()
            .unwrap();
        assert!(x.is_fixed());
    }
}
