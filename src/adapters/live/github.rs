//! Live GitHub adapter for the `IssueSource` and `ReviewRequests` ports.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::ports::issues::{IssueRef, IssueSource};
use crate::ports::review::{ReviewRequest, ReviewRequests};
use crate::ports::{PortError, PortFuture};

const GITHUB_API_VERSION: &str = "2022-11-28";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// GitHub REST client scoped to one repository.
#[derive(Clone)]
pub struct GitHubClient {
    http: Client,
    api_base: String,
    owner: String,
    repo: String,
}

/// An issue as returned by `GET /repos/{owner}/{repo}/issues`.
#[derive(Debug, Deserialize)]
struct GithubIssue {
    number: u64,
    title: String,
    body: Option<String>,
    user: GithubUser,
    /// Present when the "issue" is actually a pull request.
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GithubPullRequest {
    html_url: String,
}

/// Error body GitHub returns alongside non-2xx statuses.
#[derive(Deserialize)]
struct GithubErrorBody {
    message: String,
}

impl GitHubClient {
    /// Creates a client for `owner/repo` authenticating with `token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the
    /// HTTP client cannot be built.
    pub fn new(api_base: &str, token: &str, owner: &str, repo: &str) -> Result<Self, String> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("issue-fixer"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static(GITHUB_API_VERSION));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .map_err(|e| format!("Invalid GitHub token: {e}"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| format!("Failed to create GitHub client: {e}"))?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    fn repo_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}{path}", self.api_base, self.owner, self.repo)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<T, PortError> {
        let response = request.send().await.map_err(|e| -> PortError {
            format!("GitHub {operation} request failed: {e}").into()
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| -> PortError {
            format!("Failed to read GitHub {operation} response: {e}").into()
        })?;

        if !status.is_success() {
            let msg = serde_json::from_str::<GithubErrorBody>(&text)
                .map(|e| e.message)
                .unwrap_or(text);
            return Err(format!("GitHub {operation} failed ({}): {msg}", status.as_u16()).into());
        }

        serde_json::from_str(&text).map_err(|e| -> PortError {
            format!("Failed to parse GitHub {operation} response: {e}").into()
        })
    }
}

/// Keeps genuine issues opened by `author`, in the order GitHub returned them.
fn issues_opened_by(issues: Vec<GithubIssue>, author: &str, limit: usize) -> Vec<IssueRef> {
    issues
        .into_iter()
        .filter(|issue| issue.pull_request.is_none())
        .filter(|issue| issue.user.login.eq_ignore_ascii_case(author))
        .take(limit)
        .map(|issue| IssueRef {
            number: issue.number,
            title: issue.title,
            body: issue.body,
            author: issue.user.login,
        })
        .collect()
}

impl IssueSource for GitHubClient {
    fn list_open_issues<'a>(
        &'a self,
        author: &'a str,
        limit: usize,
    ) -> PortFuture<'a, Vec<IssueRef>> {
        Box::pin(async move {
            let per_page = limit.clamp(1, 100).to_string();
            let request = self.http.get(self.repo_url("/issues")).query(&[
                ("state", "open"),
                ("creator", author),
                ("sort", "created"),
                ("direction", "desc"),
                ("per_page", per_page.as_str()),
            ]);
            let issues: Vec<GithubIssue> = self.send_json("list issues", request).await?;
            debug!(count = issues.len(), "fetched open issues");
            Ok(issues_opened_by(issues, author, limit))
        })
    }

    fn comment<'a>(&'a self, number: u64, body: &'a str) -> PortFuture<'a, ()> {
        Box::pin(async move {
            let request = self
                .http
                .post(self.repo_url(&format!("/issues/{number}/comments")))
                .json(&json!({ "body": body }));
            let _: serde_json::Value = self.send_json("create comment", request).await?;
            Ok(())
        })
    }

    fn close<'a>(&'a self, number: u64, body: &'a str) -> PortFuture<'a, ()> {
        Box::pin(async move {
            self.comment(number, body).await?;
            let request = self
                .http
                .patch(self.repo_url(&format!("/issues/{number}")))
                .json(&json!({ "state": "closed", "state_reason": "completed" }));
            let _: serde_json::Value = self.send_json("close issue", request).await?;
            Ok(())
        })
    }
}

impl ReviewRequests for GitHubClient {
    fn open_review_request<'a>(&'a self, request: &'a ReviewRequest) -> PortFuture<'a, String> {
        Box::pin(async move {
            let http_request = self.http.post(self.repo_url("/pulls")).json(&json!({
                "title": request.title,
                "head": request.head,
                "base": request.base,
                "body": request.body,
            }));
            let pull: GithubPullRequest =
                self.send_json("create pull request", http_request).await?;
            Ok(pull.html_url)
        })
    }
}
