//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the orchestration core and an
//! external system (time, filesystem, subprocesses, git, the coding agent,
//! the issue tracker). Implementations live in `src/adapters/`.

use std::error::Error;
use std::future::Future;
use std::pin::Pin;

pub mod agent;
pub mod clock;
pub mod filesystem;
pub mod git;
pub mod issues;
pub mod review;
pub mod shell;

pub use agent::{AgentError, AgentFuture, AgentReport, AgentTask, FixAgent};
pub use clock::Clock;
pub use filesystem::FileSystem;
pub use git::{GitError, GitFuture, GitRepo};
pub use issues::{IssueRef, IssueSource};
pub use review::{ReviewRequest, ReviewRequests};
pub use shell::{ShellCommand, ShellError, ShellExecutor, ShellFuture, ShellOutput};

/// Error type returned by network-facing ports.
pub type PortError = Box<dyn Error + Send + Sync>;

/// Boxed future type alias used by network-facing ports to keep them dyn-compatible.
pub type PortFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PortError>> + Send + 'a>>;
