//! CLI command implementations

pub(crate) mod common;
pub(crate) mod migrate;
pub(crate) mod refresh;
pub(crate) mod status;
