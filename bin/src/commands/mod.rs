//! CLI command implementations.

pub(crate) mod generate;
pub(crate) mod run;
