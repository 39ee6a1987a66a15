//! CLI argument definitions.

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `issue-fixer`.
#[derive(Debug, Parser)]
#[command(
    name = "issue-fixer",
    version,
    about = "Fix GitHub issues from one author with a coding agent"
)]
pub struct Cli {
    /// The command to execute; polls forever when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Supported top-level subcommands.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Prepare the workspace and poll until Ctrl-C.
    Run,
    /// Prepare the workspace and run a single poll cycle.
    Once,
    /// Show what the ledger knows.
    Status,
    /// Drop the oldest processed issues from the ledger.
    Prune {
        /// How many processed issues to keep (defaults to `KEEP_PROCESSED`).
        #[arg(long)]
        keep: Option<usize>,
    },
}
