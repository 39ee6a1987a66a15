//! Git port for the working-copy operations the workspace manager needs.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use thiserror::Error;

/// A git invocation that failed, with the command and the diagnostic text
/// git printed.
///
/// Credentials embedded in remote URLs are redacted before they reach
/// either field.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("`git {command}` failed: {diagnostic}")]
pub struct GitError {
    /// The git subcommand and arguments.
    pub command: String,
    /// Error output from git, or a launch/timeout description.
    pub diagnostic: String,
}

impl GitError {
    /// Creates a new error for `command`.
    pub fn new(command: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self { command: command.into(), diagnostic: diagnostic.into() }
    }
}

/// Boxed future type alias used by [`GitRepo`] to keep the trait dyn-compatible.
pub type GitFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, GitError>> + Send + 'a>>;

/// Drives a git working copy.
///
/// Every operation takes the working-copy directory explicitly. No
/// operation is assumed atomic: a failed call may leave partial state
/// behind, which the next preparation pass must tolerate.
pub trait GitRepo: Send + Sync {
    /// Returns `true` if `dir` is the root of a git working copy.
    fn is_repository<'a>(&'a self, dir: &'a Path) -> GitFuture<'a, bool>;

    /// Clones `url` into `dir`.
    fn clone_into<'a>(&'a self, url: &'a str, dir: &'a Path) -> GitFuture<'a, ()>;

    /// Points `remote` at `url`.
    fn set_remote_url<'a>(
        &'a self,
        dir: &'a Path,
        remote: &'a str,
        url: &'a str,
    ) -> GitFuture<'a, ()>;

    /// Fetches all refs from `remote`.
    fn fetch<'a>(&'a self, dir: &'a Path, remote: &'a str) -> GitFuture<'a, ()>;

    /// Checks out an existing branch.
    fn checkout<'a>(&'a self, dir: &'a Path, branch: &'a str) -> GitFuture<'a, ()>;

    /// Pulls `branch` from `remote` into the current branch.
    fn pull<'a>(&'a self, dir: &'a Path, remote: &'a str, branch: &'a str) -> GitFuture<'a, ()>;

    /// Force-deletes a local branch.
    fn delete_branch<'a>(&'a self, dir: &'a Path, branch: &'a str) -> GitFuture<'a, ()>;

    /// Creates a branch at `HEAD` and checks it out.
    fn create_branch<'a>(&'a self, dir: &'a Path, branch: &'a str) -> GitFuture<'a, ()>;

    /// Discards all uncommitted changes to tracked files.
    fn reset_hard<'a>(&'a self, dir: &'a Path) -> GitFuture<'a, ()>;

    /// Removes untracked files and directories.
    fn clean_untracked<'a>(&'a self, dir: &'a Path) -> GitFuture<'a, ()>;

    /// Pushes `branch` to `remote` and sets it as upstream, replacing any
    /// earlier push of the same branch.
    fn push_branch<'a>(
        &'a self,
        dir: &'a Path,
        remote: &'a str,
        branch: &'a str,
    ) -> GitFuture<'a, ()>;

    /// Returns the name of the checked-out branch.
    fn current_branch<'a>(&'a self, dir: &'a Path) -> GitFuture<'a, String>;
}
