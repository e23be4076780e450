//! Small numeric helpers shared across the crate
pub(crate) mod numeric;
