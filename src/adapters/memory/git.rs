//! Simulated git working copy.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::ports::git::{GitError, GitFuture, GitRepo};

struct RepoState {
    trunk: String,
    cloned: bool,
    remote_url: Option<String>,
    branches: BTreeSet<String>,
    current: Option<String>,
    dirty: bool,
    pushed: BTreeSet<String>,
    failures: HashMap<&'static str, String>,
    calls: Vec<String>,
}

/// A single simulated working copy that tracks branches, the checked-out
/// branch and whether the tree has uncommitted changes.
///
/// It behaves like git where the workspace manager depends on it: a branch
/// that already exists cannot be created again and the checked-out branch
/// cannot be deleted. Any operation can be made to fail with [`fail`].
///
/// [`fail`]: SimulatedGitRepo::fail
#[derive(Clone)]
pub struct SimulatedGitRepo {
    state: Arc<Mutex<RepoState>>,
}

impl SimulatedGitRepo {
    /// Creates an uncloned repository whose trunk branch is `trunk`.
    #[must_use]
    pub fn new(trunk: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(RepoState {
                trunk: trunk.to_string(),
                cloned: false,
                remote_url: None,
                branches: BTreeSet::new(),
                current: None,
                dirty: false,
                pushed: BTreeSet::new(),
                failures: HashMap::new(),
                calls: Vec::new(),
            })),
        }
    }

    /// Makes `operation` (a [`GitRepo`] method name) fail with `diagnostic`
    /// until [`recover`](Self::recover) is called.
    pub fn fail(&self, operation: &'static str, diagnostic: &str) {
        self.lock().failures.insert(operation, diagnostic.to_string());
    }

    /// Clears an injected failure.
    pub fn recover(&self, operation: &'static str) {
        self.lock().failures.remove(operation);
    }

    /// Simulates uncommitted edits in the working tree.
    pub fn make_dirty(&self) {
        self.lock().dirty = true;
    }

    /// Returns `true` if the working tree has uncommitted edits.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    /// Returns `true` once a clone has happened.
    #[must_use]
    pub fn is_cloned(&self) -> bool {
        self.lock().cloned
    }

    /// The checked-out branch, if any.
    #[must_use]
    pub fn checked_out(&self) -> Option<String> {
        self.lock().current.clone()
    }

    /// Returns `true` if a local branch named `branch` exists.
    #[must_use]
    pub fn has_branch(&self, branch: &str) -> bool {
        self.lock().branches.contains(branch)
    }

    /// Returns `true` if `branch` has been pushed.
    #[must_use]
    pub fn was_pushed(&self, branch: &str) -> bool {
        self.lock().pushed.contains(branch)
    }

    /// The URL `origin` points at.
    #[must_use]
    pub fn remote_url(&self) -> Option<String> {
        self.lock().remote_url.clone()
    }

    /// Names of the operations invoked so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RepoState> {
        self.state.lock().expect("repo lock poisoned")
    }

    /// Records the call, applies `change` unless a failure was injected.
    fn apply<T>(
        &self,
        operation: &'static str,
        detail: String,
        change: impl FnOnce(&mut RepoState) -> Result<T, String>,
    ) -> Result<T, GitError> {
        let mut state = self.lock();
        state.calls.push(operation.to_string());
        if let Some(diagnostic) = state.failures.get(operation) {
            return Err(GitError::new(detail, diagnostic.clone()));
        }
        if operation != "clone_into" && operation != "is_repository" && !state.cloned {
            return Err(GitError::new(detail, "fatal: not a git repository"));
        }
        change(&mut *state).map_err(|diagnostic| GitError::new(detail, diagnostic))
    }
}

impl GitRepo for SimulatedGitRepo {
    fn is_repository<'a>(&'a self, _dir: &'a Path) -> GitFuture<'a, bool> {
        let result = self.apply("is_repository", "rev-parse --git-dir".into(), |s| Ok(s.cloned));
        Box::pin(async move { result })
    }

    fn clone_into<'a>(&'a self, url: &'a str, _dir: &'a Path) -> GitFuture<'a, ()> {
        let result = self.apply("clone_into", format!("clone {url}"), |s| {
            s.cloned = true;
            s.remote_url = Some(url.to_string());
            s.branches = BTreeSet::from([s.trunk.clone()]);
            s.current = Some(s.trunk.clone());
            s.dirty = false;
            Ok(())
        });
        Box::pin(async move { result })
    }

    fn set_remote_url<'a>(
        &'a self,
        _dir: &'a Path,
        remote: &'a str,
        url: &'a str,
    ) -> GitFuture<'a, ()> {
        let result = self.apply("set_remote_url", format!("remote set-url {remote}"), |s| {
            s.remote_url = Some(url.to_string());
            Ok(())
        });
        Box::pin(async move { result })
    }

    fn fetch<'a>(&'a self, _dir: &'a Path, remote: &'a str) -> GitFuture<'a, ()> {
        let result = self.apply("fetch", format!("fetch {remote}"), |_| Ok(()));
        Box::pin(async move { result })
    }

    fn checkout<'a>(&'a self, _dir: &'a Path, branch: &'a str) -> GitFuture<'a, ()> {
        let result = self.apply("checkout", format!("checkout {branch}"), |s| {
            if !s.branches.contains(branch) {
                return Err(format!("error: pathspec '{branch}' did not match any file(s)"));
            }
            s.current = Some(branch.to_string());
            Ok(())
        });
        Box::pin(async move { result })
    }

    fn pull<'a>(&'a self, _dir: &'a Path, remote: &'a str, branch: &'a str) -> GitFuture<'a, ()> {
        let result = self.apply("pull", format!("pull {remote} {branch}"), |_| Ok(()));
        Box::pin(async move { result })
    }

    fn delete_branch<'a>(&'a self, _dir: &'a Path, branch: &'a str) -> GitFuture<'a, ()> {
        let result = self.apply("delete_branch", format!("branch -D {branch}"), |s| {
            if s.current.as_deref() == Some(branch) {
                return Err(format!("error: cannot delete branch '{branch}' checked out"));
            }
            if !s.branches.remove(branch) {
                return Err(format!("error: branch '{branch}' not found"));
            }
            Ok(())
        });
        Box::pin(async move { result })
    }

    fn create_branch<'a>(&'a self, _dir: &'a Path, branch: &'a str) -> GitFuture<'a, ()> {
        let result = self.apply("create_branch", format!("checkout -b {branch}"), |s| {
            if !s.branches.insert(branch.to_string()) {
                return Err(format!("fatal: a branch named '{branch}' already exists"));
            }
            s.current = Some(branch.to_string());
            Ok(())
        });
        Box::pin(async move { result })
    }

    fn reset_hard<'a>(&'a self, _dir: &'a Path) -> GitFuture<'a, ()> {
        let result = self.apply("reset_hard", "reset --hard".into(), |s| {
            s.dirty = false;
            Ok(())
        });
        Box::pin(async move { result })
    }

    fn clean_untracked<'a>(&'a self, _dir: &'a Path) -> GitFuture<'a, ()> {
        let result = self.apply("clean_untracked", "clean -fd".into(), |s| {
            s.dirty = false;
            Ok(())
        });
        Box::pin(async move { result })
    }

    fn push_branch<'a>(
        &'a self,
        _dir: &'a Path,
        remote: &'a str,
        branch: &'a str,
    ) -> GitFuture<'a, ()> {
        let result = self.apply("push_branch", format!("push --force -u {remote} {branch}"), |s| {
            if !s.branches.contains(branch) {
                return Err(format!("error: src refspec {branch} does not match any"));
            }
            s.pushed.insert(branch.to_string());
            Ok(())
        });
        Box::pin(async move { result })
    }

    fn current_branch<'a>(&'a self, _dir: &'a Path) -> GitFuture<'a, String> {
        let result = self.apply("current_branch", "rev-parse --abbrev-ref HEAD".into(), |s| {
            Ok(s.current.clone().unwrap_or_else(|| "HEAD".to_string()))
        });
        Box::pin(async move { result })
    }
}
