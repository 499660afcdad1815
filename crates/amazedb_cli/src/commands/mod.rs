//! CLI command implementations.

pub mod backup;
pub mod database;
pub mod get;
pub mod query;
