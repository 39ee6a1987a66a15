//! Service context bundling all port trait objects.

use crate::adapters::memory::MemoryPorts;
use crate::config::Settings;
use crate::ports::agent::FixAgent;
use crate::ports::clock::Clock;
use crate::ports::filesystem::FileSystem;
use crate::ports::git::GitRepo;
use crate::ports::issues::IssueSource;
use crate::ports::review::ReviewRequests;

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external boundary. Constructors wire up
/// live adapters for production or in-memory adapters for tests.
pub struct ServiceContext {
    /// Clock for retry scheduling.
    pub clock: Box<dyn Clock>,
    /// Filesystem for the ledger store and workspace directory.
    pub fs: Box<dyn FileSystem>,
    /// Git working-copy operations.
    pub git: Box<dyn GitRepo>,
    /// Coding agent that edits the working copy.
    pub agent: Box<dyn FixAgent>,
    /// Issue tracker being polled.
    pub issues: Box<dyn IssueSource>,
    /// Service that pull requests are opened on.
    pub reviews: Box<dyn ReviewRequests>,
}

impl ServiceContext {
    /// Creates a live context talking to GitHub, `git` and the coding agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the GitHub client cannot be built.
    pub fn live(settings: &Settings) -> Result<Self, String> {
        use crate::adapters::live::agent::ClaudeCodeAgent;
        use crate::adapters::live::clock::SystemClock;
        use crate::adapters::live::filesystem::LiveFileSystem;
        use crate::adapters::live::git::LiveGitRepo;
        use crate::adapters::live::github::GitHubClient;
        use crate::adapters::live::shell::LiveShellExecutor;

        let github = GitHubClient::new(
            &settings.github_api_url,
            &settings.github_token,
            &settings.repo_owner,
            &settings.repo_name,
        )?;

        Ok(Self {
            clock: Box::new(SystemClock),
            fs: Box::new(LiveFileSystem),
            git: Box::new(LiveGitRepo::new(Box::new(LiveShellExecutor))),
            agent: Box::new(ClaudeCodeAgent::new(
                Box::new(LiveShellExecutor),
                settings.agent_command.clone(),
            )),
            issues: Box::new(github.clone()),
            reviews: Box::new(github),
        })
    }

    /// Creates a context over in-memory adapters.
    ///
    /// The context owns clones of the handles in `ports`, so the caller can
    /// keep scripting and inspecting them.
    #[must_use]
    pub fn in_memory(ports: &MemoryPorts) -> Self {
        Self {
            clock: Box::new(ports.clock.clone()),
            fs: Box::new(ports.fs.clone()),
            git: Box::new(ports.git.clone()),
            agent: Box::new(ports.agent.clone()),
            issues: Box::new(ports.tracker.clone()),
            reviews: Box::new(ports.tracker.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::Utc;

    use super::*;

    #[tokio::test]
    async fn in_memory_context_shares_state_with_handles() {
        let ports = MemoryPorts::new("main", Utc::now());
        let ctx = ServiceContext::in_memory(&ports);

        ctx.fs.write(Path::new("/a.txt"), "hello").unwrap();
        ctx.git.clone_into("url", Path::new("/repo")).await.unwrap();
        ports.clock.advance(chrono::Duration::hours(1));

        assert_eq!(ports.fs.files().len(), 1);
        assert!(ports.git.is_cloned());
        assert_eq!(ctx.clock.now(), ports.clock.now());
    }

    #[test]
    fn live_context_builds_from_settings() {
        let settings = Settings::from_lookup(|name| match name {
            "GITHUB_TOKEN" => Some("ghp_test".to_string()),
            "REPO_OWNER" => Some("acme".to_string()),
            "REPO_NAME" => Some("widgets".to_string()),
            "TARGET_USER" => Some("alice".to_string()),
            _ => None,
        })
        .unwrap();
        assert!(ServiceContext::live(&settings).is_ok());
    }
}
