//! `issue-fixer run` command.

use tracing::info;

use super::runtime;
use crate::config::Settings;
use crate::context::ServiceContext;
use crate::poller::Poller;

/// Execute the `run` command.
///
/// Prepares the working copy, then polls until interrupted.
///
/// # Errors
///
/// Returns an error string if the working copy cannot be set up.
pub fn run(ctx: &ServiceContext, settings: &Settings) -> Result<(), String> {
    info!(
        repo = %settings.repo_url(),
        user = %settings.target_user,
        "starting issue fixer"
    );
    runtime()?.block_on(async {
        let mut poller = Poller::new(ctx, settings);
        poller.initialize().await.map_err(|e| format!("Failed to initialize workspace: {e}"))?;
        poller.run().await;
        info!("issue fixer stopped");
        Ok::<(), String>(())
    })
}
