//! Subcommand implementations.

pub mod convert;
pub mod mark;
