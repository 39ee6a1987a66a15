//! `issue-fixer once` command.

use super::runtime;
use crate::config::Settings;
use crate::context::ServiceContext;
use crate::poller::{CycleReport, Poller};

/// Execute the `once` command.
///
/// Prepares the working copy, runs one poll cycle and prints its tally.
///
/// # Errors
///
/// Returns an error string if the working copy cannot be set up or the
/// issues cannot be listed.
pub fn run(ctx: &ServiceContext, settings: &Settings) -> Result<(), String> {
    let report = runtime()?.block_on(async {
        let mut poller = Poller::new(ctx, settings);
        poller.initialize().await.map_err(|e| format!("Failed to initialize workspace: {e}"))?;
        poller.run_cycle().await
    })?;
    println!("{}", format_report(&report));
    Ok(())
}

fn format_report(report: &CycleReport) -> String {
    format!(
        "Fetched {} issue(s), {} eligible: {} fixed, {} failed.",
        report.fetched, report.eligible, report.succeeded, report.failed
    )
}
