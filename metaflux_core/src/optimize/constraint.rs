//! Provides struct for representing a constraint in an optimization problem
use std::fmt::{Display, Formatter};

/// Represents a linear constraint in an optimization problem
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Represents an equality constraint, where `terms` = `equals`
    Equality {
        /// Used to identify the constraint
        id: String,
        /// Linear terms which are added together, see [`ConstraintTerm`] for more
        terms: Vec<ConstraintTerm>,
        /// The right hand side of the equality constraint
        equals: f64,
    },
    /// Represents an inequality constraint, `lower_bound` <= `terms` <= `upper_bound`
    Inequality {
        /// Used to identify the constraint
        id: String,
        /// Linear terms which are added together, see [`ConstraintTerm`] for more
        terms: Vec<ConstraintTerm>,
        /// The lowest value the sum of the terms can take (may be -inf)
        lower_bound: f64,
        /// The highest value the sum of the terms can take (may be inf)
        upper_bound: f64,
    },
}

impl Constraint {
    /// Create a new equality constraint
    pub fn new_equality(id: &str, terms: Vec<ConstraintTerm>, equals: f64) -> Self {
        Constraint::Equality {
            id: id.to_string(),
            terms,
            equals,
        }
    }

    /// Create a new inequality constraint
    pub fn new_inequality(
        id: &str,
        terms: Vec<ConstraintTerm>,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Self {
        Constraint::Inequality {
            id: id.to_string(),
            terms,
            lower_bound,
            upper_bound,
        }
    }

    pub fn get_id(&self) -> &str {
        match self {
            Constraint::Equality { id, .. } | Constraint::Inequality { id, .. } => id,
        }
    }

    pub fn terms(&self) -> &[ConstraintTerm] {
        match self {
            Constraint::Equality { terms, .. } | Constraint::Inequality { terms, .. } => terms,
        }
    }

    /// Convert a slice of terms into a String representation
    fn terms_to_string(terms: &[ConstraintTerm]) -> String {
        if terms.is_empty() {
            return "0".to_string();
        }
        terms
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

impl Display for Constraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Constraint::Equality { terms, equals, .. } => {
                write!(f, "{} = {}", Self::terms_to_string(terms), equals)
            }
            Constraint::Inequality {
                terms,
                lower_bound,
                upper_bound,
                ..
            } => write!(
                f,
                "{} <= {} <= {}",
                lower_bound,
                Self::terms_to_string(terms),
                upper_bound
            ),
        }
    }
}

/// Represents a single term in a constraint, specifically
/// represents the multiplication of the variable by the `coefficient`
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintTerm {
    /// Id of the variable
    pub variable: String,
    /// Index of the variable within its problem
    pub(crate) index: usize,
    /// The coefficient for the variable
    pub coefficient: f64,
}

impl Display for ConstraintTerm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}*{}", self.coefficient, self.variable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(id: &str, index: usize, coefficient: f64) -> ConstraintTerm {
        ConstraintTerm {
            variable: id.to_string(),
            index,
            coefficient,
        }
    }

    #[test]
    fn display() {
        let eq = Constraint::new_equality("c1", vec![term("x", 0, 3.), term("y", 1, 2.)], 6.);
        assert_eq!(eq.to_string(), "3*x + 2*y = 6");
        assert_eq!(eq.get_id(), "c1");
        let ineq = Constraint::new_inequality("c2", vec![term("x", 0, 1.)], 2., 4.);
        assert_eq!(ineq.to_string(), "2 <= 1*x <= 4");
        let empty = Constraint::new_equality("c3", vec![], 0.);
        assert_eq!(empty.to_string(), "0 = 0");
    }
}
