//! Review-request port for proposing a pushed branch for merge.

use super::PortFuture;

/// A pull request to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRequest {
    /// Branch carrying the proposed change.
    pub head: String,
    /// Branch the change should merge into.
    pub base: String,
    /// Pull request title.
    pub title: String,
    /// Pull request description.
    pub body: String,
}

/// Opens review requests on the hosting service.
pub trait ReviewRequests: Send + Sync {
    /// Opens a review request and returns its URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the hosting service rejects the request.
    fn open_review_request<'a>(&'a self, request: &'a ReviewRequest) -> PortFuture<'a, String>;
}
