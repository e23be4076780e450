//! Strain design: knockout searches on a model
use thiserror::Error;

use crate::optimize::{OptimizationStatus, OptimizeError};

pub mod scope;
pub mod strain;

#[derive(Error, Debug)]
pub enum DesignError {
    #[error("Target reaction {0} not found in the model")]
    TargetNotFound(String),
    #[error("Baseline optimization was not successful, status: {0}")]
    NonOptimal(OptimizationStatus),
    #[error(transparent)]
    Optimize(#[from] OptimizeError),
}
