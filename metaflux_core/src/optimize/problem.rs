//! Provides struct representing an optimization problem
use indexmap::IndexMap;
use thiserror::Error;

use crate::optimize::constraint::{Constraint, ConstraintTerm};
use crate::optimize::objective::{Objective, ObjectiveSense, ObjectiveTerm};
use crate::optimize::variable::{Variable, VariableBuilder};

/// An optimization problem with continuous variables, linear constraints, and a linear or
/// quadratic objective
#[derive(Debug, Clone)]
pub struct Problem {
    /// Objective to optimize
    objective: Objective,
    /// Variables of the optimization problem
    variables: IndexMap<String, Variable>,
    /// Constraints of the optimization problem
    constraints: IndexMap<String, Constraint>,
}

impl Problem {
    // region Creation Functions
    /// Create a new optimization problem
    pub fn new(objective_sense: ObjectiveSense) -> Self {
        Self {
            objective: Objective::new(objective_sense),
            variables: IndexMap::new(),
            constraints: IndexMap::new(),
        }
    }

    /// Create a new maximization problem
    pub fn new_maximization() -> Self {
        Self::new(ObjectiveSense::Maximize)
    }

    /// Create a new minimization problem
    pub fn new_minimization() -> Self {
        Self::new(ObjectiveSense::Minimize)
    }
    // endregion Creation Functions

    // region Accessors
    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn variables(&self) -> &IndexMap<String, Variable> {
        &self.variables
    }

    pub fn variable(&self, id: &str) -> Option<&Variable> {
        self.variables.get(id)
    }

    pub fn constraints(&self) -> &IndexMap<String, Constraint> {
        &self.constraints
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn has_quadratic_objective_terms(&self) -> bool {
        self.objective.contains_quadratic()
    }
    // endregion Accessors

    /// Update the objective sense of the problem
    pub fn update_objective_sense(&mut self, sense: ObjectiveSense) {
        self.objective.set_sense(sense);
    }

    // region Adding Variables
    /// Create a new variable and add it to the optimization problem
    pub fn add_new_variable(
        &mut self,
        id: &str,
        name: Option<&str>,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        let variable = VariableBuilder::default()
            .id(id)
            .name(name.map(|n| n.to_string()))
            .lower_bound(lower_bound)
            .upper_bound(upper_bound)
            .build()
            .map_err(|err| ProblemError::InvalidVariable(err.to_string()))?;
        self.add_variable(variable)
    }

    /// Add a variable to the optimization problem, its index is assigned here
    pub fn add_variable(&mut self, mut variable: Variable) -> Result<(), ProblemError> {
        if self.variables.contains_key(&variable.id) {
            return Err(ProblemError::VariableIdAlreadyExists(variable.id));
        }
        if variable.lower_bound > variable.upper_bound {
            return Err(ProblemError::InvalidVariableBounds(variable.id));
        }
        variable.index = self.variables.len();
        self.variables.insert(variable.id.clone(), variable);
        Ok(())
    }
    // endregion Adding Variables

    // region Adding Constraints
    /// Create a new equality constraint using variable ids, and add it to the problem
    pub fn add_new_equality_constraint_by_id(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        equals: f64,
    ) -> Result<(), ProblemError> {
        self.validate_constraint_id(id)?;
        let terms = self.zip_into_terms(variables, coefficients)?;
        self.constraints
            .insert(id.to_string(), Constraint::new_equality(id, terms, equals));
        Ok(())
    }

    /// Create a new inequality constraint using variable ids, and add it to the problem
    pub fn add_new_inequality_constraint_by_id(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        self.validate_constraint_id(id)?;
        if lower_bound > upper_bound {
            return Err(ProblemError::InvalidConstraintBounds(id.to_string()));
        }
        let terms = self.zip_into_terms(variables, coefficients)?;
        self.constraints.insert(
            id.to_string(),
            Constraint::new_inequality(id, terms, lower_bound, upper_bound),
        );
        Ok(())
    }

    /// Remove a constraint (by id) from the problem
    pub fn remove_constraint(&mut self, constraint_id: &str) -> Option<Constraint> {
        self.constraints.shift_remove(constraint_id)
    }
    // endregion Adding Constraints

    // region Objective Terms
    /// Add a new linear term to the objective using the variable id
    pub fn add_new_linear_objective_term_by_id(
        &mut self,
        variable_id: &str,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        let var = self.variable_index(variable_id, ProblemError::NonExistentVariablesInObjective)?;
        self.objective
            .add_term(ObjectiveTerm::new_linear(var, coefficient));
        Ok(())
    }

    /// Add a new quadratic term to the objective using the variable ids
    pub fn add_new_quadratic_objective_term_by_id(
        &mut self,
        variable1: &str,
        variable2: &str,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        let var1 = self.variable_index(variable1, ProblemError::NonExistentVariablesInObjective)?;
        let var2 = self.variable_index(variable2, ProblemError::NonExistentVariablesInObjective)?;
        self.objective
            .add_term(ObjectiveTerm::new_quadratic(var1, var2, coefficient));
        Ok(())
    }

    /// Remove all terms from the objective
    pub fn remove_all_objective_terms(&mut self) {
        self.objective.remove_all_terms();
    }
    // endregion Objective Terms

    // region update variable bounds
    /// Update the bounds of a variable
    pub fn update_variable_bounds(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        if lower_bound > upper_bound {
            return Err(ProblemError::InvalidVariableBounds(id.to_string()));
        }
        match self.variables.get_mut(id) {
            Some(var) => {
                var.lower_bound = lower_bound;
                var.upper_bound = upper_bound;
                Ok(())
            }
            None => Err(ProblemError::NonExistentVariable(id.to_string())),
        }
    }
    // endregion update variable bounds

    // region Helpers
    fn variable_index(
        &self,
        id: &str,
        err: fn(String) -> ProblemError,
    ) -> Result<usize, ProblemError> {
        self.variables
            .get(id)
            .map(|v| v.index)
            .ok_or_else(|| err(id.to_string()))
    }

    fn validate_constraint_id(&self, id: &str) -> Result<(), ProblemError> {
        if self.constraints.contains_key(id) {
            return Err(ProblemError::ConstraintAlreadyExists(id.to_string()));
        }
        Ok(())
    }

    /// Zip a slice of variable ids with their coefficients
    fn zip_into_terms(
        &self,
        variables: &[&str],
        coefficients: &[f64],
    ) -> Result<Vec<ConstraintTerm>, ProblemError> {
        if variables.len() != coefficients.len() {
            return Err(ProblemError::MismatchedTerms {
                variables: variables.len(),
                coefficients: coefficients.len(),
            });
        }
        variables
            .iter()
            .zip(coefficients)
            .map(|(id, coef)| {
                let index =
                    self.variable_index(id, ProblemError::NonExistentVariablesInConstraint)?;
                Ok(ConstraintTerm {
                    variable: id.to_string(),
                    index,
                    coefficient: *coef,
                })
            })
            .collect()
    }
    // endregion Helpers
}

/// Errors associated with the Problem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    /// Error when trying to add a variable with the same id as an existing variable
    #[error("Tried to add variable {0} which already exists")]
    VariableIdAlreadyExists(String),
    /// Error when trying to add variable with invalid bounds
    #[error("Variable {0} has lower_bound > upper_bound")]
    InvalidVariableBounds(String),
    /// Variable could not be built
    #[error("Unable to build variable: {0}")]
    InvalidVariable(String),
    /// Error when trying to add a constraint with the same id as an existing constraint
    #[error("Tried to add constraint {0} which already exists")]
    ConstraintAlreadyExists(String),
    /// Error when trying to add a constraint with invalid bounds
    #[error("Inequality constraint {0} has lower_bound > upper_bound")]
    InvalidConstraintBounds(String),
    /// Error when trying to add a constraint that contains variables not in the problem
    #[error("Constraint references variable {0} which is not in the problem")]
    NonExistentVariablesInConstraint(String),
    /// Error when trying to add an objective term which includes variables not in the problem
    #[error("Objective term references variable {0} which is not in the problem")]
    NonExistentVariablesInObjective(String),
    /// Error when trying to update a variable that doesn't exist
    #[error("Tried to access variable {0} which doesn't exist")]
    NonExistentVariable(String),
    /// Variable and coefficient slices differ in length
    #[error("Got {variables} variables but {coefficients} coefficients")]
    MismatchedTerms {
        variables: usize,
        coefficients: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_problem() {
        let max_problem = Problem::new_maximization();
        assert_eq!(max_problem.objective.sense(), ObjectiveSense::Maximize);

        let mut min_problem = Problem::new_minimization();
        assert_eq!(min_problem.objective.sense(), ObjectiveSense::Minimize);
        min_problem.update_objective_sense(ObjectiveSense::Maximize);
        assert_eq!(min_problem.objective.sense(), ObjectiveSense::Maximize);
    }

    #[test]
    fn add_variables() {
        let mut problem = Problem::new_maximization();
        problem.add_new_variable("x", None, 64., 100.).unwrap();
        problem.add_new_variable("y", Some("why"), 0., 1.).unwrap();
        let y = problem.variable("y").unwrap();
        assert_eq!(y.index(), 1);
        assert_eq!(y.name.as_deref(), Some("why"));
        assert!((problem.variable("x").unwrap().lower_bound - 64.0).abs() < 1e-25);

        assert_eq!(
            problem.add_new_variable("x", None, 0., 1.),
            Err(ProblemError::VariableIdAlreadyExists("x".to_string()))
        );
        assert_eq!(
            problem.add_new_variable("z", None, 100., 64.),
            Err(ProblemError::InvalidVariableBounds("z".to_string()))
        );
    }

    #[test]
    fn add_constraint() {
        let mut problem = Problem::new_maximization();
        problem.add_new_variable("x", None, 64., 100.).unwrap();
        problem.add_new_variable("y", None, 64., 100.).unwrap();

        problem
            .add_new_equality_constraint_by_id("eq", &["x", "y"], &[2., 3.], 200.)
            .unwrap();
        match problem.constraints().get("eq").unwrap() {
            Constraint::Equality { equals, terms, .. } => {
                assert!((equals - 200.).abs() < 1e-25);
                assert_eq!(terms[1].index, 1);
            }
            Constraint::Inequality { .. } => panic!("Incorrect constraint type added"),
        }

        problem
            .add_new_inequality_constraint_by_id("ineq", &["x", "y"], &[2., 3.], 100., 200.)
            .unwrap();
        match problem.constraints().get("ineq").unwrap() {
            Constraint::Inequality {
                lower_bound,
                upper_bound,
                ..
            } => {
                assert!((lower_bound - 100.).abs() < 1e-25);
                assert!((upper_bound - 200.).abs() < 1e-25);
            }
            Constraint::Equality { .. } => panic!("Incorrect constraint type added"),
        }
        assert!(problem.remove_constraint("ineq").is_some());
        assert_eq!(problem.constraints().len(), 1);
    }

    #[test]
    fn add_bad_constraint() {
        let mut problem = Problem::new_maximization();
        problem.add_new_variable("x", None, 64., 100.).unwrap();
        assert_eq!(
            problem.add_new_inequality_constraint_by_id("bad", &["x"], &[2.], 200., 100.),
            Err(ProblemError::InvalidConstraintBounds("bad".to_string()))
        );
        assert_eq!(
            problem.add_new_equality_constraint_by_id("bad", &["q"], &[2.], 0.),
            Err(ProblemError::NonExistentVariablesInConstraint("q".to_string()))
        );
        assert!(matches!(
            problem.add_new_equality_constraint_by_id("bad", &["x"], &[1., 2.], 0.),
            Err(ProblemError::MismatchedTerms { .. })
        ));
    }

    #[test]
    fn objective_terms_and_bounds() {
        let mut problem = Problem::new_minimization();
        problem.add_new_variable("x", None, 0., 10.).unwrap();
        problem
            .add_new_quadratic_objective_term_by_id("x", "x", 1.0)
            .unwrap();
        assert!(problem.has_quadratic_objective_terms());
        assert!(problem.add_new_linear_objective_term_by_id("y", 1.0).is_err());
        problem.remove_all_objective_terms();
        assert!(!problem.has_quadratic_objective_terms());

        problem.update_variable_bounds("x", 2., 3.).unwrap();
        assert_eq!(problem.variable("x").unwrap().upper_bound, 3.);
        assert!(problem.update_variable_bounds("x", 4., 3.).is_err());
        assert!(problem.update_variable_bounds("nope", 0., 1.).is_err());
    }
}
