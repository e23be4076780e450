//! Reading and writing models and workspaces
pub mod gpr_parse;
pub mod json;
pub mod workspace;
