//! Post processing of flux solutions: solution summaries, byproduct impact, gene expression
//! constraints and 3D placement
pub mod byproduct;
pub mod omics;
pub mod projection;
pub mod solution;
