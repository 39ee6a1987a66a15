//! Drives the coding agent on a prepared workspace and publishes the result.

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use crate::context::ServiceContext;
use crate::outcome::{Failure, Outcome};
use crate::ports::agent::AgentTask;
use crate::ports::issues::IssueRef;
use crate::ports::review::ReviewRequest;
use crate::prompt::{fix_prompt, SYSTEM_PROMPT};
use crate::workspace::branch_name;

const REMOTE: &str = "origin";

/// Runs the coding agent for one issue, then pushes its branch and opens a
/// pull request against trunk.
pub struct FixInvoker<'a> {
    ctx: &'a ServiceContext,
    trunk: String,
    timeout: Duration,
}

impl<'a> FixInvoker<'a> {
    /// Creates an invoker that opens pull requests against `trunk` and gives
    /// the agent at most `timeout` per issue.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext, trunk: &str, timeout: Duration) -> Self {
        Self { ctx, trunk: trunk.to_string(), timeout }
    }

    /// Attempts a fix for `issue` in the working copy at `workspace`, which
    /// must already be on the issue branch.
    ///
    /// Agent problems (including timeouts) become agent failures. The branch
    /// is only published when the agent succeeds; push and pull-request
    /// problems become publish failures.
    pub async fn run(&self, workspace: &Path, issue: &IssueRef) -> Outcome {
        let task = AgentTask {
            prompt: fix_prompt(issue),
            system_prompt: SYSTEM_PROMPT.to_string(),
            timeout: self.timeout,
        };

        info!(issue = issue.number, "running coding agent");
        let report = self.ctx.agent.run(workspace, &task).await.map_err(|e| {
            warn!(issue = issue.number, error = %e, "coding agent failed");
            Failure::agent(e.to_string())
        })?;
        if let Some(cost) = report.cost_usd {
            info!(issue = issue.number, cost_usd = cost, "coding agent finished");
        }
        if let Some(summary) = &report.summary {
            info!(issue = issue.number, summary = %summary, "agent summary");
        }

        let branch = branch_name(issue.number);
        self.ctx
            .git
            .push_branch(workspace, REMOTE, &branch)
            .await
            .map_err(|e| Failure::publish(format!("failed to push {branch}: {e}")))?;

        let request = ReviewRequest {
            head: branch,
            base: self.trunk.clone(),
            title: format!("Fix: {} (#{})", issue.title, issue.number),
            body: format!("Automated fix for issue #{n}\n\nCloses #{n}", n = issue.number),
        };
        let url = self
            .ctx
            .reviews
            .open_review_request(&request)
            .await
            .map_err(|e| Failure::publish(format!("failed to open pull request: {e}")))?;

        info!(issue = issue.number, url = %url, "pull request opened");
        Ok(format!("Pull request: {url}"))
    }
}
