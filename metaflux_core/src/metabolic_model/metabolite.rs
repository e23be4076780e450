//! This module provides the metabolite struct representing a metabolite

use std::hash::Hash;

use derive_builder::Builder;
use indexmap::IndexMap;
use thiserror::Error;

/// Represents a metabolite
#[derive(Builder, Debug, Clone)]
pub struct Metabolite {
    /// Used to identify the metabolite (must be unique)
    pub id: String,
    /// Human Readable name of the metabolite
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Which compartment the metabolite is in
    #[builder(default = "None")]
    pub compartment: Option<String>,
    /// Electrical charge of the Metabolite
    #[builder(default = "0")]
    pub charge: i32,
    /// Chemical Formula of the metabolite
    #[builder(default = "None")]
    pub formula: Option<String>,
    /// Notes about the metabolite
    #[builder(default = "None")]
    pub notes: Option<String>,
    /// Metabolite annotations
    #[builder(default = "None")]
    pub annotation: Option<String>,
}

impl Metabolite {
    /// Parse the chemical formula into a map of element symbol to atom count
    ///
    /// A metabolite without a formula has no elements.
    ///
    /// # Examples
    /// ```rust
    /// use metaflux_core::metabolic_model::metabolite::MetaboliteBuilder;
    /// let glucose = MetaboliteBuilder::default()
    ///     .id("glc__D_e".to_string())
    ///     .formula(Some("C6H12O6".to_string()))
    ///     .build()
    ///     .unwrap();
    /// let elements = glucose.elements().unwrap();
    /// assert_eq!(elements["C"], 6.0);
    /// ```
    pub fn elements(&self) -> Result<IndexMap<String, f64>, FormulaError> {
        match &self.formula {
            Some(formula) => parse_formula(formula),
            None => Ok(IndexMap::new()),
        }
    }

    /// Number of carbon atoms in the metabolite, 0 if the formula has no carbon
    pub fn carbon_atoms(&self) -> Result<f64, FormulaError> {
        Ok(self.elements()?.get("C").copied().unwrap_or(0.0))
    }
}

impl Hash for Metabolite {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state); // Hash by id
                             // If the metabolite has an associated compartment, also hash by that
        if let Some(ref compartment) = self.compartment {
            compartment.hash(state)
        };
    }
}

/// Parse a chemical formula such as `C6H12O6` into element counts
///
/// Elements are an upper case letter followed by any lower case letters, with an optional
/// (possibly fractional) count, repeated elements are summed.
pub fn parse_formula(formula: &str) -> Result<IndexMap<String, f64>, FormulaError> {
    let chars: Vec<char> = formula.trim().chars().collect();
    let mut elements: IndexMap<String, f64> = IndexMap::new();
    let mut current = 0usize;
    while current < chars.len() {
        let c = chars[current];
        if !c.is_ascii_uppercase() {
            return Err(FormulaError::UnexpectedCharacter(c, current));
        }
        let start = current;
        current += 1;
        while current < chars.len() && chars[current].is_ascii_lowercase() {
            current += 1;
        }
        let symbol: String = chars[start..current].iter().collect();

        let count_start = current;
        while current < chars.len() && (chars[current].is_ascii_digit() || chars[current] == '.')
        {
            current += 1;
        }
        let count = if count_start == current {
            1.0
        } else {
            let text: String = chars[count_start..current].iter().collect();
            text.parse::<f64>()
                .map_err(|_| FormulaError::InvalidCount(text.clone()))?
        };
        *elements.entry(symbol).or_insert(0.0) += count;
    }
    Ok(elements)
}

/// Errors produced while parsing a chemical formula
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormulaError {
    #[error("Unexpected character `{0}` at position {1} in formula")]
    UnexpectedCharacter(char, usize),
    #[error("Invalid element count `{0}` in formula")]
    InvalidCount(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_formulas() {
        let glucose = parse_formula("C6H12O6").unwrap();
        assert_eq!(glucose["C"], 6.0);
        assert_eq!(glucose["H"], 12.0);
        assert_eq!(glucose["O"], 6.0);

        let co2 = parse_formula("CO2").unwrap();
        assert_eq!(co2["C"], 1.0);
        assert_eq!(co2["O"], 2.0);
    }

    #[test]
    fn multi_letter_elements() {
        let nacl = parse_formula("NaCl").unwrap();
        assert_eq!(nacl["Na"], 1.0);
        assert_eq!(nacl["Cl"], 1.0);
        assert!(nacl.get("C").is_none());
    }

    #[test]
    fn repeated_elements_are_summed() {
        let formula = parse_formula("CH3COOH").unwrap();
        assert_eq!(formula["C"], 2.0);
        assert_eq!(formula["H"], 4.0);
        assert_eq!(formula["O"], 2.0);
    }

    #[test]
    fn invalid_formula() {
        assert_eq!(
            parse_formula("C6(H2O)6"),
            Err(FormulaError::UnexpectedCharacter('(', 2))
        );
        assert!(parse_formula("C1.2.3").is_err());
    }

    #[test]
    fn carbon_atoms() {
        let no_formula = MetaboliteBuilder::default()
            .id("x".to_string())
            .build()
            .unwrap();
        assert_eq!(no_formula.carbon_atoms().unwrap(), 0.0);

        let water = MetaboliteBuilder::default()
            .id("h2o_c".to_string())
            .formula(Some("H2O".to_string()))
            .build()
            .unwrap();
        assert_eq!(water.carbon_atoms().unwrap(), 0.0);

        let acetate = MetaboliteBuilder::default()
            .id("ac_e".to_string())
            .formula(Some("C2H3O2".to_string()))
            .build()
            .unwrap();
        assert_eq!(acetate.carbon_atoms().unwrap(), 2.0);
    }
}
