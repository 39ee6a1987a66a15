//! In-memory adapters for tests and dry runs.
//!
//! Every adapter is a cheap handle over shared state: clone one, box the
//! clone into a [`ServiceContext`](crate::context::ServiceContext), and keep
//! the original to script behavior and inspect what happened.

pub mod agent;
pub mod clock;
pub mod filesystem;
pub mod git;
pub mod issues;
pub mod shell;

pub use agent::ScriptedAgent;
pub use clock::ManualClock;
pub use filesystem::MemoryFileSystem;
pub use git::SimulatedGitRepo;
pub use issues::MemoryIssueTracker;
pub use shell::ScriptedShellExecutor;

use chrono::{DateTime, Utc};

/// Handles to one set of in-memory adapters.
#[derive(Clone)]
pub struct MemoryPorts {
    /// Manually advanced clock.
    pub clock: ManualClock,
    /// In-memory filesystem.
    pub fs: MemoryFileSystem,
    /// Simulated working copy.
    pub git: SimulatedGitRepo,
    /// Scripted coding agent.
    pub agent: ScriptedAgent,
    /// Issue tracker and review service.
    pub tracker: MemoryIssueTracker,
}

impl MemoryPorts {
    /// Creates adapters for a repository whose trunk is `trunk`, with the
    /// clock set to `now`.
    #[must_use]
    pub fn new(trunk: &str, now: DateTime<Utc>) -> Self {
        Self {
            clock: ManualClock::new(now),
            fs: MemoryFileSystem::new(),
            git: SimulatedGitRepo::new(trunk),
            agent: ScriptedAgent::new(),
            tracker: MemoryIssueTracker::new(),
        }
    }
}
