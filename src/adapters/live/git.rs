//! Live git adapter that drives the `git` CLI through the shell port.

use std::path::Path;
use std::time::Duration;

use crate::ports::git::{GitError, GitFuture, GitRepo};
use crate::ports::shell::{ShellCommand, ShellError, ShellExecutor};

/// Upper bound for a full clone.
const CLONE_TIMEOUT: Duration = Duration::from_secs(300);
/// Upper bound for fetch, pull and push.
const NETWORK_TIMEOUT: Duration = Duration::from_secs(120);

/// Live git adapter that shells out to the `git` CLI.
pub struct LiveGitRepo {
    shell: Box<dyn ShellExecutor>,
}

impl LiveGitRepo {
    /// Creates a git adapter that runs commands through `shell`.
    #[must_use]
    pub fn new(shell: Box<dyn ShellExecutor>) -> Self {
        Self { shell }
    }

    async fn git(
        &self,
        dir: Option<&Path>,
        args: &[&str],
        timeout: Option<Duration>,
    ) -> Result<String, GitError> {
        let mut command =
            ShellCommand::new("git").args(args.iter().copied()).env("GIT_TERMINAL_PROMPT", "0");
        if let Some(dir) = dir {
            command = command.current_dir(dir);
        }
        if let Some(limit) = timeout {
            command = command.timeout(limit);
        }

        let label = redact_credentials(&args.join(" "));
        let output = self
            .shell
            .run(&command)
            .await
            .map_err(|e| GitError::new(label.clone(), redact_credentials(&e.to_string())))?;
        if !output.success() {
            return Err(GitError::new(label, redact_credentials(output.diagnostic())));
        }
        Ok(output.stdout)
    }
}

impl GitRepo for LiveGitRepo {
    fn is_repository<'a>(&'a self, dir: &'a Path) -> GitFuture<'a, bool> {
        Box::pin(async move {
            let command = ShellCommand::new("git").args(["rev-parse", "--git-dir"]).current_dir(dir);
            match self.shell.run(&command).await {
                // A subdirectory of some other checkout reports the parent's
                // absolute git dir; only a working-copy root answers `.git`.
                Ok(output) => Ok(output.success() && output.stdout.trim() == ".git"),
                Err(ShellError::Launch { .. }) => Ok(false),
                Err(e) => Err(GitError::new("rev-parse --git-dir", e.to_string())),
            }
        })
    }

    fn clone_into<'a>(&'a self, url: &'a str, dir: &'a Path) -> GitFuture<'a, ()> {
        Box::pin(async move {
            let target = dir.to_string_lossy();
            self.git(None, &["clone", url, &*target], Some(CLONE_TIMEOUT)).await.map(drop)
        })
    }

    fn set_remote_url<'a>(
        &'a self,
        dir: &'a Path,
        remote: &'a str,
        url: &'a str,
    ) -> GitFuture<'a, ()> {
        Box::pin(async move {
            self.git(Some(dir), &["remote", "set-url", remote, url], None).await.map(drop)
        })
    }

    fn fetch<'a>(&'a self, dir: &'a Path, remote: &'a str) -> GitFuture<'a, ()> {
        Box::pin(async move {
            self.git(Some(dir), &["fetch", remote], Some(NETWORK_TIMEOUT)).await.map(drop)
        })
    }

    fn checkout<'a>(&'a self, dir: &'a Path, branch: &'a str) -> GitFuture<'a, ()> {
        Box::pin(async move { self.git(Some(dir), &["checkout", branch], None).await.map(drop) })
    }

    fn pull<'a>(&'a self, dir: &'a Path, remote: &'a str, branch: &'a str) -> GitFuture<'a, ()> {
        Box::pin(async move {
            self.git(Some(dir), &["pull", remote, branch], Some(NETWORK_TIMEOUT)).await.map(drop)
        })
    }

    fn delete_branch<'a>(&'a self, dir: &'a Path, branch: &'a str) -> GitFuture<'a, ()> {
        Box::pin(async move {
            self.git(Some(dir), &["branch", "-D", branch], None).await.map(drop)
        })
    }

    fn create_branch<'a>(&'a self, dir: &'a Path, branch: &'a str) -> GitFuture<'a, ()> {
        Box::pin(async move {
            self.git(Some(dir), &["checkout", "-b", branch], None).await.map(drop)
        })
    }

    fn reset_hard<'a>(&'a self, dir: &'a Path) -> GitFuture<'a, ()> {
        Box::pin(async move { self.git(Some(dir), &["reset", "--hard"], None).await.map(drop) })
    }

    fn clean_untracked<'a>(&'a self, dir: &'a Path) -> GitFuture<'a, ()> {
        Box::pin(async move { self.git(Some(dir), &["clean", "-fd"], None).await.map(drop) })
    }

    fn push_branch<'a>(
        &'a self,
        dir: &'a Path,
        remote: &'a str,
        branch: &'a str,
    ) -> GitFuture<'a, ()> {
        Box::pin(async move {
            let args = ["push", "--force", "-u", remote, branch];
            self.git(Some(dir), &args, Some(NETWORK_TIMEOUT)).await.map(drop)
        })
    }

    fn current_branch<'a>(&'a self, dir: &'a Path) -> GitFuture<'a, String> {
        Box::pin(async move {
            let stdout = self.git(Some(dir), &["rev-parse", "--abbrev-ref", "HEAD"], None).await?;
            Ok(stdout.trim().to_string())
        })
    }
}

/// Replaces the userinfo part of every URL in `text` with `***`.
#[must_use]
pub fn redact_credentials(text: &str) -> String {
    let mut redacted = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("://") {
        let (scheme, tail) = rest.split_at(pos + 3);
        redacted.push_str(scheme);
        let authority_end =
            tail.find(|c: char| c == '/' || c.is_whitespace()).unwrap_or(tail.len());
        let authority = &tail[..authority_end];
        match authority.rfind('@') {
            Some(at) => {
                redacted.push_str("***");
                redacted.push_str(&authority[at..]);
            }
            None => redacted.push_str(authority),
        }
        rest = &tail[authority_end..];
    }
    redacted.push_str(rest);
    redacted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::ScriptedShellExecutor;
    use crate::ports::shell::ShellOutput;

    fn repo_with(shell: &ScriptedShellExecutor) -> LiveGitRepo {
        LiveGitRepo::new(Box::new(shell.clone()))
    }

    #[test]
    fn redacts_tokens_in_urls() {
        let text = "fatal: could not read from https://ghp_secret@github.com/acme/app.git";
        assert_eq!(
            redact_credentials(text),
            "fatal: could not read from https://***@github.com/acme/app.git"
        );
        assert_eq!(redact_credentials("no urls here"), "no urls here");
        assert_eq!(
            redact_credentials("https://github.com/acme/app.git"),
            "https://github.com/acme/app.git"
        );
    }

    #[tokio::test]
    async fn runs_commands_in_working_copy() {
        let shell = ScriptedShellExecutor::new();
        let git = repo_with(&shell);
        let dir = Path::new("/work/repo");

        git.checkout(dir, "main").await.unwrap();
        git.delete_branch(dir, "fix-issue-7").await.unwrap();
        git.create_branch(dir, "fix-issue-7").await.unwrap();

        let commands = shell.commands();
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0].display(), "git checkout main");
        assert_eq!(commands[1].display(), "git branch -D fix-issue-7");
        assert_eq!(commands[2].display(), "git checkout -b fix-issue-7");
        assert!(commands.iter().all(|c| c.cwd.as_deref() == Some(dir)));
        assert!(commands
            .iter()
            .all(|c| c.env.contains(&("GIT_TERMINAL_PROMPT".to_string(), "0".to_string()))));
    }

    #[tokio::test]
    async fn non_zero_exit_becomes_git_error() {
        let shell = ScriptedShellExecutor::new();
        shell.respond("git checkout main", ShellOutput::failed(1, "error: pathspec 'main'"));
        let git = repo_with(&shell);

        let err = git.checkout(Path::new("/work/repo"), "main").await.unwrap_err();
        assert_eq!(err.command, "checkout main");
        assert!(err.diagnostic.contains("pathspec"));
    }

    #[tokio::test]
    async fn clone_error_does_not_leak_token() {
        let shell = ScriptedShellExecutor::new();
        shell.respond(
            "git clone",
            ShellOutput::failed(128, "fatal: repository 'https://tok@github.com/a/b.git' not found"),
        );
        let git = repo_with(&shell);

        let err = git
            .clone_into("https://tok@github.com/a/b.git", Path::new("/work/repo"))
            .await
            .unwrap_err();
        assert!(!err.to_string().contains("tok@"));
        assert!(err.command.starts_with("clone https://***@github.com/a/b.git"));
        assert_eq!(shell.commands()[0].timeout, Some(CLONE_TIMEOUT));
    }

    #[tokio::test]
    async fn is_repository_requires_working_copy_root() {
        let shell = ScriptedShellExecutor::new();
        shell.respond("git rev-parse --git-dir", ShellOutput::ok("/home/me/project/.git\n"));
        let git = repo_with(&shell);
        assert!(!git.is_repository(Path::new("/home/me/project/sub")).await.unwrap());

        let shell = ScriptedShellExecutor::new();
        shell.respond("git rev-parse --git-dir", ShellOutput::ok(".git\n"));
        let git = repo_with(&shell);
        assert!(git.is_repository(Path::new("/work/repo")).await.unwrap());
    }

    #[tokio::test]
    async fn push_replaces_an_earlier_push_of_the_branch() {
        let shell = ScriptedShellExecutor::new();
        let git = repo_with(&shell);

        git.push_branch(Path::new("/work/repo"), "origin", "fix-issue-9").await.unwrap();
        let commands = shell.commands();
        assert_eq!(commands[0].display(), "git push --force -u origin fix-issue-9");
        assert_eq!(commands[0].timeout, Some(NETWORK_TIMEOUT));
    }

    #[tokio::test]
    async fn current_branch_is_trimmed() {
        let shell = ScriptedShellExecutor::new();
        shell.respond("git rev-parse --abbrev-ref HEAD", ShellOutput::ok("main\n"));
        let git = repo_with(&shell);

        assert_eq!(git.current_branch(Path::new("/work/repo")).await.unwrap(), "main");
    }
}
