//! Tagged result of processing one issue.

use std::fmt;

use thiserror::Error;

/// Stage at which processing an issue failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The working copy could not be prepared.
    Workspace,
    /// The coding agent failed, timed out, or could not be launched.
    Agent,
    /// The branch could not be pushed or the pull request opened.
    Publish,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Workspace => "workspace",
            Self::Agent => "agent",
            Self::Publish => "publish",
        };
        f.write_str(label)
    }
}

/// Why an issue could not be fixed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} failure: {message}")]
pub struct Failure {
    /// Failing stage.
    pub kind: FailureKind,
    /// Human-readable detail, safe to post on the issue.
    pub message: String,
}

impl Failure {
    /// A workspace preparation failure.
    pub fn workspace(message: impl Into<String>) -> Self {
        Self { kind: FailureKind::Workspace, message: message.into() }
    }

    /// A coding agent failure.
    pub fn agent(message: impl Into<String>) -> Self {
        Self { kind: FailureKind::Agent, message: message.into() }
    }

    /// A push or pull-request failure.
    pub fn publish(message: impl Into<String>) -> Self {
        Self { kind: FailureKind::Publish, message: message.into() }
    }
}

/// `Ok` carries the success message for the issue comment.
pub type Outcome = Result<String, Failure>;
