//! The persistent working copy that issues are fixed in, one at a time.
//!
//! Between issues the working copy sits on trunk with a clean tree. Work on
//! an issue happens through an [`IssueLease`], which holds the workspace
//! exclusively and puts it back on trunk when released. A lease dropped
//! without being released leaves its branch behind; the next
//! [`Workspace::prepare_for_issue`] or [`Workspace::initialize`] removes it
//! before doing anything else.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::context::ServiceContext;
use crate::ports::git::GitError;

const REMOTE: &str = "origin";

/// Branch an issue's fix is developed on.
#[must_use]
pub fn branch_name(issue: u64) -> String {
    format!("fix-issue-{issue}")
}

/// Errors that stop an issue (or start-up) before the agent runs.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// `prepare_for_issue` was called before a working copy exists.
    #[error("no git working copy at {}; initialize the workspace first", .0.display())]
    NotInitialized(PathBuf),
    /// The repository could not be cloned.
    #[error("failed to clone repository: {0}")]
    Clone(#[source] GitError),
    /// Trunk could not be checked out.
    #[error("failed to check out trunk: {0}")]
    Checkout(#[source] GitError),
    /// The issue branch could not be created.
    #[error("failed to create issue branch: {0}")]
    Branch(#[source] GitError),
    /// The workspace directory could not be prepared on disk.
    #[error("failed to prepare {}: {reason}", .path.display())]
    Filesystem {
        /// Directory involved.
        path: PathBuf,
        /// Underlying filesystem error.
        reason: String,
    },
}

/// Owner of the shared working copy.
pub struct Workspace<'a> {
    ctx: &'a ServiceContext,
    dir: PathBuf,
    remote_url: String,
    trunk: String,
    active: Option<String>,
    abandoned: Option<String>,
}

impl<'a> Workspace<'a> {
    /// Creates a manager for the working copy at `dir`, cloned from
    /// `remote_url`, whose integration branch is `trunk`.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext, dir: &Path, remote_url: &str, trunk: &str) -> Self {
        Self {
            ctx,
            dir: dir.to_path_buf(),
            remote_url: remote_url.to_string(),
            trunk: trunk.to_string(),
            active: None,
            abandoned: None,
        }
    }

    /// Directory holding the working copy.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Trunk branch name.
    #[must_use]
    pub fn trunk(&self) -> &str {
        &self.trunk
    }

    /// Branch of the issue currently being worked on.
    #[must_use]
    pub fn active_branch(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Branch left behind by a lease that was never released.
    #[must_use]
    pub fn abandoned_branch(&self) -> Option<&str> {
        self.abandoned.as_deref()
    }

    /// Makes sure a usable working copy exists, cloning it if needed.
    ///
    /// An existing working copy gets its remote URL reset and trunk checked
    /// out, then is fetched. A directory that is not a git repository is
    /// removed and cloned afresh. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns an error if the clone or the trunk checkout fails, or the
    /// directory cannot be replaced.
    pub async fn initialize(&mut self) -> Result<(), WorkspaceError> {
        if self.is_repository().await {
            self.recover_abandoned().await;
            match self.ctx.git.current_branch(&self.dir).await {
                Ok(head) => {
                    info!(dir = %self.dir.display(), head = %head, "refreshing working copy");
                }
                Err(e) => warn!(error = %e, "could not read the checked-out branch"),
            }

            if let Err(e) = self.ctx.git.set_remote_url(&self.dir, REMOTE, &self.remote_url).await
            {
                warn!(error = %e, "failed to reset remote url");
            }
            self.discard_changes().await;
            self.ctx.git.checkout(&self.dir, &self.trunk).await.map_err(WorkspaceError::Checkout)?;
            if let Err(e) = self.ctx.git.fetch(&self.dir, REMOTE).await {
                warn!(error = %e, "fetch failed, continuing with local state");
            }
            return Ok(());
        }

        if self.ctx.fs.exists(&self.dir) {
            warn!(dir = %self.dir.display(), "directory is not a git repository, replacing it");
            self.ctx.fs.remove_dir_all(&self.dir).map_err(|e| fs_error(&self.dir, &e))?;
        }
        if let Some(parent) = self.dir.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.ctx.fs.create_dir_all(parent).map_err(|e| fs_error(parent, &e))?;
        }

        info!(dir = %self.dir.display(), "cloning repository");
        self.ctx.git.clone_into(&self.remote_url, &self.dir).await.map_err(WorkspaceError::Clone)?;
        self.abandoned = None;
        Ok(())
    }

    /// Puts the working copy on a fresh `fix-issue-{issue}` branch off an
    /// up-to-date trunk.
    ///
    /// A failed pull is logged and work continues on the local trunk.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no working copy, trunk cannot be checked
    /// out, or the issue branch cannot be created.
    pub async fn prepare_for_issue(
        &mut self,
        issue: u64,
    ) -> Result<IssueLease<'_, 'a>, WorkspaceError> {
        if !self.is_repository().await {
            return Err(WorkspaceError::NotInitialized(self.dir.clone()));
        }
        self.recover_abandoned().await;

        self.discard_changes().await;
        self.ctx.git.checkout(&self.dir, &self.trunk).await.map_err(WorkspaceError::Checkout)?;
        if let Err(e) = self.ctx.git.pull(&self.dir, REMOTE, &self.trunk).await {
            warn!(issue, error = %e, "pull failed, branching from local trunk");
        }

        let branch = branch_name(issue);
        if let Err(e) = self.ctx.git.delete_branch(&self.dir, &branch).await {
            debug!(issue, error = %e, "no stale branch to delete");
        }
        if let Err(e) = self.ctx.git.create_branch(&self.dir, &branch).await {
            if let Err(restore) = self.ctx.git.checkout(&self.dir, &self.trunk).await {
                warn!(issue, error = %restore, "failed to return to trunk");
            }
            return Err(WorkspaceError::Branch(e));
        }

        info!(issue, branch = %branch, "workspace ready");
        self.active = Some(branch.clone());
        Ok(IssueLease { workspace: self, issue, branch, released: false })
    }

    /// Returns the working copy to a clean trunk after an issue.
    ///
    /// The issue branch is deleted unless the attempt succeeded. Problems are
    /// logged; if trunk cannot be checked out the branch is recorded as
    /// abandoned so the next preparation retries the cleanup.
    pub async fn cleanup_after_issue(&mut self, success: bool) {
        let Some(branch) = self.active.clone() else {
            debug!("no active issue branch to clean up");
            return;
        };

        self.discard_changes().await;
        if let Err(e) = self.ctx.git.checkout(&self.dir, &self.trunk).await {
            warn!(branch = %branch, error = %e, "failed to return to trunk after issue");
            self.active = None;
            self.abandoned = Some(branch);
            return;
        }
        if !success {
            if let Err(e) = self.ctx.git.delete_branch(&self.dir, &branch).await {
                warn!(branch = %branch, error = %e, "failed to delete issue branch");
            }
        }
        self.discard_changes().await;

        debug!(branch = %branch, success, "workspace back on trunk");
        self.active = None;
    }

    async fn is_repository(&self) -> bool {
        match self.ctx.git.is_repository(&self.dir).await {
            Ok(found) => found,
            Err(e) => {
                debug!(error = %e, "repository check failed");
                false
            }
        }
    }

    /// Drops a branch left by a lease that was never released.
    async fn recover_abandoned(&mut self) {
        let Some(branch) = self.abandoned.take() else {
            return;
        };
        warn!(branch = %branch, "cleaning up after an interrupted issue");

        self.discard_changes().await;
        if let Err(e) = self.ctx.git.checkout(&self.dir, &self.trunk).await {
            warn!(error = %e, "failed to return to trunk during recovery");
            return;
        }
        if let Err(e) = self.ctx.git.delete_branch(&self.dir, &branch).await {
            debug!(branch = %branch, error = %e, "abandoned branch already gone");
        }
    }

    async fn discard_changes(&self) {
        if let Err(e) = self.ctx.git.reset_hard(&self.dir).await {
            warn!(error = %e, "failed to reset working tree");
        }
        if let Err(e) = self.ctx.git.clean_untracked(&self.dir).await {
            warn!(error = %e, "failed to remove untracked files");
        }
    }
}

fn fs_error(path: &Path, err: &dyn std::fmt::Display) -> WorkspaceError {
    WorkspaceError::Filesystem { path: path.to_path_buf(), reason: err.to_string() }
}

/// Exclusive use of the workspace for one issue.
///
/// Call [`release`](Self::release) when done. Dropping the lease instead
/// marks its branch as abandoned.
pub struct IssueLease<'w, 'a> {
    workspace: &'w mut Workspace<'a>,
    issue: u64,
    branch: String,
    released: bool,
}

impl IssueLease<'_, '_> {
    /// Working copy directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.workspace.dir
    }

    /// Issue branch that is checked out.
    #[must_use]
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Issue being worked on.
    #[must_use]
    pub fn issue(&self) -> u64 {
        self.issue
    }

    /// Returns the workspace to a clean trunk.
    pub async fn release(mut self, success: bool) {
        self.workspace.cleanup_after_issue(success).await;
        self.released = true;
    }
}

impl Drop for IssueLease<'_, '_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Some(branch) = self.workspace.active.take() {
            warn!(issue = self.issue, branch = %branch, "issue lease dropped without release");
            self.workspace.abandoned = Some(branch);
        }
    }
}
