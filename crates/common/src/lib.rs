//! Shared runtime helpers: tracing initialisation and startup directory checks.

pub mod env;
pub mod utils;
