//! Command dispatch and handlers.

pub mod once;
pub mod prune;
pub mod run;
pub mod status;

use tracing::debug;

use crate::cli::Command;
use crate::config::Settings;
use crate::context::ServiceContext;
use crate::logging;

/// Dispatch a parsed command to its handler.
///
/// Loads `.env` if present, reads the configuration and installs logging
/// before any command runs.
///
/// # Errors
///
/// Returns an error string if configuration is invalid or the selected
/// command handler fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(format!("Failed to load .env: {e}"));
        }
    }
    let settings = Settings::from_env().map_err(|e| format!("Configuration error: {e}"))?;
    let _guard = logging::init(&settings.log_level, &settings.log_file)?;
    debug!(?settings, "configuration loaded");

    let ctx = ServiceContext::live(&settings)?;
    match command {
        Command::Run => run::run(&ctx, &settings),
        Command::Once => once::run(&ctx, &settings),
        Command::Status => status::run(&ctx, &settings),
        Command::Prune { keep } => prune::run(&ctx, &settings, *keep),
    }
}

/// Builds the single-threaded runtime every async command runs on.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start async runtime: {e}"))
}
