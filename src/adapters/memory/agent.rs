//! Scripted coding agent.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::SimulatedGitRepo;
use crate::ports::agent::{AgentError, AgentFuture, AgentReport, AgentTask, FixAgent};

#[derive(Default)]
struct AgentScript {
    queued: VecDeque<Result<AgentReport, AgentError>>,
    fallback: Option<AgentError>,
    edits: Option<SimulatedGitRepo>,
    runs: Vec<(PathBuf, AgentTask)>,
}

/// A coding agent that replays queued outcomes.
///
/// Once the queue is empty, runs succeed with an empty report unless
/// [`always_fail`](Self::always_fail) set a standing error.
#[derive(Clone, Default)]
pub struct ScriptedAgent {
    script: Arc<Mutex<AgentScript>>,
}

impl ScriptedAgent {
    /// Creates an agent that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful run.
    pub fn succeed_with(&self, report: AgentReport) {
        self.lock().queued.push_back(Ok(report));
    }

    /// Queues a failed run.
    pub fn fail_with(&self, error: AgentError) {
        self.lock().queued.push_back(Err(error));
    }

    /// Fails every run once the queue is drained.
    pub fn always_fail(&self, error: AgentError) {
        self.lock().fallback = Some(error);
    }

    /// Leaves uncommitted edits in `repo` on every run, the way a real
    /// agent would.
    pub fn edits(&self, repo: &SimulatedGitRepo) {
        self.lock().edits = Some(repo.clone());
    }

    /// Workspace and task of every run so far.
    #[must_use]
    pub fn runs(&self) -> Vec<(PathBuf, AgentTask)> {
        self.lock().runs.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AgentScript> {
        self.script.lock().expect("agent script lock poisoned")
    }
}

impl FixAgent for ScriptedAgent {
    fn run<'a>(&'a self, workspace: &'a Path, task: &'a AgentTask) -> AgentFuture<'a> {
        let outcome = {
            let mut script = self.lock();
            script.runs.push((workspace.to_path_buf(), task.clone()));
            if let Some(repo) = &script.edits {
                repo.make_dirty();
            }
            match script.queued.pop_front() {
                Some(outcome) => outcome,
                None => script.fallback.clone().map_or_else(|| Ok(AgentReport::default()), Err),
            }
        };
        Box::pin(async move { outcome })
    }
}
