//! Live adapter for the `FixAgent` port running the `claude` CLI headless.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::ports::agent::{AgentError, AgentFuture, AgentReport, AgentTask, FixAgent};
use crate::ports::shell::{ShellCommand, ShellError, ShellExecutor};

/// Tools the agent may use without asking.
const ALLOWED_TOOLS: [&str; 9] =
    ["Bash", "Read", "Edit", "Write", "MultiEdit", "Glob", "Grep", "WebFetch", "WebSearch"];

/// Longest diagnostic or summary kept from agent output.
const MAX_EXCERPT_CHARS: usize = 2000;

/// Runs the Claude Code CLI in print mode inside the workspace.
pub struct ClaudeCodeAgent {
    shell: Box<dyn ShellExecutor>,
    program: String,
}

/// The JSON result object printed with `--output-format json`.
#[derive(Debug, Deserialize)]
struct AgentPayload {
    #[serde(default)]
    is_error: bool,
    result: Option<String>,
    total_cost_usd: Option<f64>,
}

impl ClaudeCodeAgent {
    /// Creates an agent adapter that launches `program` through `shell`.
    pub fn new(shell: Box<dyn ShellExecutor>, program: impl Into<String>) -> Self {
        Self { shell, program: program.into() }
    }

    fn command(&self, workspace: &Path, task: &AgentTask) -> ShellCommand {
        ShellCommand::new(&self.program)
            .arg("--print")
            .arg(&task.prompt)
            .args(["--output-format", "json", "--allowedTools"])
            .args(ALLOWED_TOOLS)
            .arg("--append-system-prompt")
            .arg(&task.system_prompt)
            .current_dir(workspace)
            .timeout(task.timeout)
    }
}

impl FixAgent for ClaudeCodeAgent {
    fn run<'a>(&'a self, workspace: &'a Path, task: &'a AgentTask) -> AgentFuture<'a> {
        Box::pin(async move {
            let command = self.command(workspace, task);
            debug!(workspace = %workspace.display(), program = %self.program, "launching coding agent");

            let output = self.shell.run(&command).await.map_err(|err| match &err {
                ShellError::TimedOut { limit, .. } => AgentError::TimedOut(*limit),
                ShellError::Launch { .. } => AgentError::Launch(err.to_string()),
            })?;

            if !output.success() {
                return Err(AgentError::Exit {
                    code: output.exit_code,
                    diagnostic: excerpt(output.diagnostic()),
                });
            }
            interpret_payload(&output.stdout)
        })
    }
}

/// Reads the optional JSON payload; anything unparseable counts as success
/// because the exit status already said so.
fn interpret_payload(stdout: &str) -> Result<AgentReport, AgentError> {
    match serde_json::from_str::<AgentPayload>(stdout.trim()) {
        Ok(payload) if payload.is_error => Err(AgentError::Reported(excerpt(
            payload.result.as_deref().unwrap_or("no details given"),
        ))),
        Ok(payload) => Ok(AgentReport {
            summary: payload.result.as_deref().map(excerpt),
            cost_usd: payload.total_cost_usd,
        }),
        Err(e) => {
            debug!(error = %e, "agent output was not a JSON result");
            Ok(AgentReport::default())
        }
    }
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(MAX_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
