//! In-memory issue tracker and review service.

use std::sync::{Arc, Mutex};

use crate::ports::issues::{IssueRef, IssueSource};
use crate::ports::review::{ReviewRequest, ReviewRequests};
use crate::ports::{PortError, PortFuture};

#[derive(Default)]
struct TrackerState {
    issues: Vec<(IssueRef, bool)>,
    comments: Vec<(u64, String)>,
    closed: Vec<u64>,
    reviews: Vec<ReviewRequest>,
    fail_listing: bool,
    fail_comments: bool,
    fail_reviews: bool,
}

/// Holds issues and review requests in memory.
///
/// Listing returns open issues newest first, the same order the hosted
/// tracker uses.
#[derive(Clone, Default)]
pub struct MemoryIssueTracker {
    state: Arc<Mutex<TrackerState>>,
}

impl MemoryIssueTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an open issue.
    pub fn open_issue(&self, number: u64, title: &str, author: &str) {
        self.lock().issues.push((
            IssueRef {
                number,
                title: title.to_string(),
                body: Some(format!("Details for {title}")),
                author: author.to_string(),
            },
            true,
        ));
    }

    /// Makes listing fail.
    pub fn fail_listing(&self, fail: bool) {
        self.lock().fail_listing = fail;
    }

    /// Makes comments and closes fail.
    pub fn fail_comments(&self, fail: bool) {
        self.lock().fail_comments = fail;
    }

    /// Makes opening review requests fail.
    pub fn fail_reviews(&self, fail: bool) {
        self.lock().fail_reviews = fail;
    }

    /// Comments posted on `number`, oldest first.
    #[must_use]
    pub fn comments_on(&self, number: u64) -> Vec<String> {
        self.lock()
            .comments
            .iter()
            .filter(|(n, _)| *n == number)
            .map(|(_, body)| body.clone())
            .collect()
    }

    /// Returns `true` if `number` was closed.
    #[must_use]
    pub fn is_closed(&self, number: u64) -> bool {
        self.lock().closed.contains(&number)
    }

    /// Review requests opened so far.
    #[must_use]
    pub fn reviews(&self) -> Vec<ReviewRequest> {
        self.lock().reviews.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TrackerState> {
        self.state.lock().expect("tracker lock poisoned")
    }
}

fn unavailable(what: &str) -> PortError {
    format!("{what}: tracker unavailable").into()
}

impl IssueSource for MemoryIssueTracker {
    fn list_open_issues<'a>(
        &'a self,
        author: &'a str,
        limit: usize,
    ) -> PortFuture<'a, Vec<IssueRef>> {
        let result = {
            let state = self.lock();
            if state.fail_listing {
                Err(unavailable("list issues"))
            } else {
                let mut open: Vec<IssueRef> = state
                    .issues
                    .iter()
                    .filter(|(issue, open)| *open && issue.author.eq_ignore_ascii_case(author))
                    .map(|(issue, _)| issue.clone())
                    .collect();
                open.sort_by(|a, b| b.number.cmp(&a.number));
                open.truncate(limit);
                Ok(open)
            }
        };
        Box::pin(async move { result })
    }

    fn comment<'a>(&'a self, number: u64, body: &'a str) -> PortFuture<'a, ()> {
        let result = {
            let mut state = self.lock();
            if state.fail_comments {
                Err(unavailable("comment"))
            } else {
                state.comments.push((number, body.to_string()));
                Ok(())
            }
        };
        Box::pin(async move { result })
    }

    fn close<'a>(&'a self, number: u64, body: &'a str) -> PortFuture<'a, ()> {
        let result = {
            let mut state = self.lock();
            if state.fail_comments {
                Err(unavailable("close"))
            } else {
                state.comments.push((number, body.to_string()));
                state.closed.push(number);
                for (issue, open) in &mut state.issues {
                    if issue.number == number {
                        *open = false;
                    }
                }
                Ok(())
            }
        };
        Box::pin(async move { result })
    }
}

impl ReviewRequests for MemoryIssueTracker {
    fn open_review_request<'a>(&'a self, request: &'a ReviewRequest) -> PortFuture<'a, String> {
        let result = {
            let mut state = self.lock();
            if state.fail_reviews {
                Err(unavailable("open pull request"))
            } else {
                state.reviews.push(request.clone());
                Ok(format!("https://example.test/pull/{}", state.reviews.len()))
            }
        };
        Box::pin(async move { result })
    }
}
