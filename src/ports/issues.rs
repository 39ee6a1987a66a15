//! Issue source port for the tracker being polled.

use serde::{Deserialize, Serialize};

use super::PortFuture;

/// An issue as fetched from the tracker. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    /// The issue number, unique within the repository.
    pub number: u64,
    /// The issue title.
    pub title: String,
    /// The issue body, if the author wrote one.
    pub body: Option<String>,
    /// Login of the user who opened the issue.
    pub author: String,
}

/// Lists issues and mirrors processing outcomes back onto them.
///
/// Outcomes posted here are informational. Failures to post are logged by
/// callers and never affect the ledger.
pub trait IssueSource: Send + Sync {
    /// Lists open issues opened by `author`, newest first, excluding pull
    /// requests, returning at most `limit` issues.
    ///
    /// # Errors
    ///
    /// Returns an error if the tracker cannot be queried.
    fn list_open_issues<'a>(&'a self, author: &'a str, limit: usize)
        -> PortFuture<'a, Vec<IssueRef>>;

    /// Posts a comment on an issue.
    ///
    /// # Errors
    ///
    /// Returns an error if the comment cannot be created.
    fn comment<'a>(&'a self, number: u64, body: &'a str) -> PortFuture<'a, ()>;

    /// Posts a closing comment and closes the issue.
    ///
    /// # Errors
    ///
    /// Returns an error if either the comment or the state change fails.
    fn close<'a>(&'a self, number: u64, body: &'a str) -> PortFuture<'a, ()>;
}
