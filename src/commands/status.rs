//! `issue-fixer status` command.

use std::fmt::Write;

use crate::config::Settings;
use crate::context::ServiceContext;
use crate::ledger::Ledger;

/// Execute the `status` command.
///
/// Prints ledger counts and the issues waiting for a retry.
///
/// # Errors
///
/// Never fails once configuration has loaded; the signature matches the
/// other commands.
pub fn run(ctx: &ServiceContext, settings: &Settings) -> Result<(), String> {
    let ledger = Ledger::load(ctx, &settings.ledger_path);
    print!("{}", format_status(&ledger));
    Ok(())
}

/// Renders the ledger summary.
#[must_use]
pub fn format_status(ledger: &Ledger<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Ledger: {}", ledger.path().display());
    let _ = writeln!(out, "Processed issues: {}", ledger.processed_count());
    let _ = writeln!(out, "Failed issues: {}", ledger.failed_count());
    let updated = ledger
        .last_updated()
        .map_or_else(|| "never".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string());
    let _ = writeln!(out, "Last updated: {updated}");

    let pending = ledger.pending_retries();
    if pending.is_empty() {
        out.push_str("No retries pending.\n");
        return out;
    }
    out.push_str("\nPending retries:\n");
    for (id, record) in pending {
        let _ = writeln!(
            out,
            "  #{id:<8} attempts {:<3} next retry {}",
            record.attempts,
            record.next_retry_at.format("%Y-%m-%d %H:%M UTC"),
        );
    }
    out
}
