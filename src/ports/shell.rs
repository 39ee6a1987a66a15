//! Shell executor port for running external commands.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

/// A program invocation: executable, arguments, working directory and an
/// optional hard time limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    /// The program to execute (looked up on `PATH`).
    pub program: String,
    /// Arguments passed verbatim, without shell interpretation.
    pub args: Vec<String>,
    /// Working directory for the child process.
    pub cwd: Option<PathBuf>,
    /// Extra environment variables for the child process.
    pub env: Vec<(String, String)>,
    /// Kill the child and report [`ShellError::TimedOut`] after this long.
    pub timeout: Option<Duration>,
}

impl ShellCommand {
    /// Creates a command for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new(), cwd: None, env: Vec::new(), timeout: None }
    }

    /// Appends a single argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Sets an environment variable for the child process.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Sets the hard time limit.
    #[must_use]
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Renders the command line for logs and diagnostics.
    #[must_use]
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// The output of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellOutput {
    /// The exit code of the process (`-1` when killed by a signal).
    pub exit_code: i32,
    /// The captured standard output.
    pub stdout: String,
    /// The captured standard error.
    pub stderr: String,
}

impl ShellOutput {
    /// A successful run that printed `stdout`.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self { exit_code: 0, stdout: stdout.into(), stderr: String::new() }
    }

    /// A failed run with the given exit code and diagnostic.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self { exit_code, stdout: String::new(), stderr: stderr.into() }
    }

    /// Returns `true` if the process exited with status zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// The most useful diagnostic text: stderr when present, else stdout.
    #[must_use]
    pub fn diagnostic(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim()
        } else {
            stderr
        }
    }
}

/// Failures that prevent a command from producing an exit status.
#[derive(Debug, Error)]
pub enum ShellError {
    /// The process could not be spawned.
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        /// The program that failed to start.
        program: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The process exceeded its time limit and was killed.
    #[error("`{program}` timed out after {}s", .limit.as_secs())]
    TimedOut {
        /// The program that was killed.
        program: String,
        /// The limit that was exceeded.
        limit: Duration,
    },
}

/// Boxed future type alias used by [`ShellExecutor`] to keep the trait dyn-compatible.
pub type ShellFuture<'a> = Pin<Box<dyn Future<Output = Result<ShellOutput, ShellError>> + Send + 'a>>;

/// Executes external programs.
///
/// A non-zero exit is a normal [`ShellOutput`], not an error; callers decide
/// what a failing exit status means.
pub trait ShellExecutor: Send + Sync {
    /// Runs the command to completion and captures its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned or exceeds its timeout.
    fn run<'a>(&'a self, command: &'a ShellCommand) -> ShellFuture<'a>;
}
