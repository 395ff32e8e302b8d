//! Subcommand implementations.

pub mod check;
pub mod collections;
pub mod edit;
pub mod list;
