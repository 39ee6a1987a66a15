//! Coding agent port.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

/// A task handed to the coding agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentTask {
    /// The task description.
    pub prompt: String,
    /// Standing instructions appended to the agent's system prompt.
    pub system_prompt: String,
    /// Hard limit on the agent's run time.
    pub timeout: Duration,
}

/// What a successful agent run reported about itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentReport {
    /// Short summary of the agent's result text, if it produced one.
    pub summary: Option<String>,
    /// Cost of the run in US dollars, if reported.
    pub cost_usd: Option<f64>,
}

/// Why an agent run did not succeed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgentError {
    /// The agent process could not be started.
    #[error("coding agent could not be launched: {0}")]
    Launch(String),
    /// The agent exceeded its time limit and was killed.
    #[error("coding agent timed out after {} minutes", .0.as_secs() / 60)]
    TimedOut(Duration),
    /// The agent exited with a non-zero status.
    #[error("coding agent exited with code {code}: {diagnostic}")]
    Exit {
        /// Exit status of the agent process.
        code: i32,
        /// Error output of the agent.
        diagnostic: String,
    },
    /// The agent exited cleanly but flagged its own result as an error.
    #[error("coding agent reported an error: {0}")]
    Reported(String),
}

/// Boxed future type alias used by [`FixAgent`] to keep the trait dyn-compatible.
pub type AgentFuture<'a> = Pin<Box<dyn Future<Output = Result<AgentReport, AgentError>> + Send + 'a>>;

/// An external coding agent that edits files in a working copy.
///
/// The agent is a black box: it receives a task, mutates files under
/// `workspace` as a side effect and reports success or failure.
pub trait FixAgent: Send + Sync {
    /// Runs the agent on `task` inside `workspace`.
    ///
    /// # Errors
    ///
    /// Returns an error on launch failure, timeout, non-zero exit or a
    /// self-reported error.
    fn run<'a>(&'a self, workspace: &'a Path, task: &'a AgentTask) -> AgentFuture<'a>;
}
