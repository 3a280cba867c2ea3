//! Command-line host for the `yamlcore` document registry.
//!
//! The binary parses [`Cli`], builds a [`yamlcore::Registry`] from the layered
//! configuration plus command-line overrides, and hands both to
//! [`commands::run`].

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
