//! CLI command implementations

pub mod alerts;
pub mod evaluate;
pub mod import;
