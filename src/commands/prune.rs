//! `issue-fixer prune` command.

use crate::config::Settings;
use crate::context::ServiceContext;
use crate::ledger::Ledger;

/// Execute the `prune` command.
///
/// Keeps the `keep` highest processed issue numbers, or `KEEP_PROCESSED`
/// when `keep` is not given.
///
/// # Errors
///
/// Returns an error string if the ledger cannot be written.
pub fn run(ctx: &ServiceContext, settings: &Settings, keep: Option<usize>) -> Result<(), String> {
    let keep = keep.unwrap_or(settings.keep_processed);
    let mut ledger = Ledger::load(ctx, &settings.ledger_path);
    let removed = ledger.prune(keep).map_err(|e| e.to_string())?;
    println!(
        "Pruned {removed} processed issue(s); {} remain.",
        ledger.processed_count()
    );
    Ok(())
}
