//! Core library entry for the `issue-fixer` service.
//!
//! The service polls a GitHub repository for issues opened by one user,
//! asks a coding agent to fix each in a persistent working copy, opens a
//! pull request with the result and keeps a ledger so no issue is handled
//! twice.

pub mod adapters;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod fixer;
pub mod ledger;
pub mod logging;
pub mod outcome;
pub mod poller;
pub mod ports;
pub mod prompt;
pub mod workspace;

use clap::error::ErrorKind;
use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.print().map_err(|e| e.to_string())?;
            return Ok(());
        }
        Err(err) => return Err(err.to_string()),
    };
    commands::dispatch(cli.command.as_ref().unwrap_or(&cli::Command::Run))
}
