//! Command-line argument parsing for DocuMind
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// DocuMind - ask questions about your own documents
#[derive(Parser, Debug)]
#[command(name = "documind")]
#[command(version)]
#[command(about = "Index PDF, DOCX and TXT files and answer questions from them", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decode, chunk and index documents
    Ingest {
        /// Files to add (.pdf, .txt, .docx)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Answer a question from the indexed documents
    Ask {
        question: String,

        /// Number of fragments to retrieve (defaults to the configured top_k)
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Show the most similar fragments without generating an answer
    Search {
        query: String,

        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Display index statistics
    Stats,

    /// Delete the persisted index
    Clear,

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }
}

impl Verbosity {
    /// Default tracing filter for this verbosity
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
            Verbosity::VeryVerbose => "trace",
        }
    }

    /// Check if should show progress bars
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }
}
