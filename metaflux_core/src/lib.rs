//! Core of MetaFlux, constraint based simulation and strain design for microbial metabolism.
//!
//! A [`simulation::Simulator`] wraps a [`metabolic_model::model::Model`] and applies growth
//! conditions and genetic modifications to it. Static flux balance results are summarized by
//! [`analysis::solution`], batch cultures are integrated by [`simulation::dynamic`] and knockout
//! strategies are searched by [`design::strain`].
pub mod analysis;
pub mod configuration;
pub mod design;
pub mod io;
pub mod metabolic_model;
pub mod optimize;
pub mod report;
pub mod simulation;
mod utils;

pub use utils::numeric::sanitize_float;

#[cfg(test)]
mod test_models;
