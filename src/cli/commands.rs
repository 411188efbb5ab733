//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - ask: send one question through the queue
//! - batch: queue every line of a file and print answers in order
//! - config: print the effective configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// chatgate - rate-limited Gemini request queue
#[derive(Parser, Debug)]
#[command(name = "chatgate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a single question
    Ask {
        /// Question text
        question: String,
    },

    /// Queue every non-empty line of a file as a separate question
    Batch {
        /// File with one question per line
        file: PathBuf,
    },

    /// Print the effective configuration as YAML
    Config,
}
