//! CLI module for chatgate - command-line interface and subcommands.
//!
//! Stands in for the HTTP handler: it hands prompts to the queue and prints
//! whatever each completion handle resolves to.

pub mod commands;

pub use commands::Cli;
