//! Task text handed to the coding agent.

use std::fmt::Write;

use crate::ports::issues::IssueRef;

/// Appended to the agent's own system prompt on every run.
pub const SYSTEM_PROMPT: &str = "You are running unattended inside a clean checkout of the \
repository on a dedicated branch. Nobody will answer questions. Make the smallest complete change \
that resolves the issue, follow the project's existing conventions, run the project's own build \
and test commands when they exist, and commit your work before you finish. Do not push and do not \
switch branches.";

/// Builds the task prompt for `issue`.
#[must_use]
pub fn fix_prompt(issue: &IssueRef) -> String {
    let mut prompt = format!("Fix GitHub issue #{}: {}\n\n", issue.number, issue.title);

    prompt.push_str("## Issue details\n");
    match issue.body.as_deref().map(str::trim) {
        Some(body) if !body.is_empty() => {
            prompt.push_str(body);
            prompt.push('\n');
        }
        _ => prompt.push_str("(no description provided; work from the title)\n"),
    }

    prompt.push_str(
        "\n## How to work\n\
         1. Explore the project first: read the README, the build manifests and the code near \
         anything the issue mentions. Search for keywords from the issue.\n\
         2. Find the root cause before changing code. Reproduce the problem with a test when the \
         project has a test suite.\n\
         3. Implement the fix in the style of the surrounding code. Keep unrelated code untouched.\n\
         4. Run the existing build, lint and test commands and fix anything you broke.\n",
    );

    // Writing to a String cannot fail.
    let _ = write!(
        prompt,
        "5. Stage and commit everything with the message \"fix: resolve issue #{} - {}\".\n",
        issue.number,
        commit_subject(&issue.title),
    );
    prompt
}

/// Shortens `title` to a single-line commit subject.
fn commit_subject(title: &str) -> String {
    let line = title.lines().next().unwrap_or_default().trim();
    if line.chars().count() > 60 {
        let short: String = line.chars().take(57).collect();
        format!("{}...", short.trim_end())
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(body: Option<&str>) -> IssueRef {
        IssueRef {
            number: 42,
            title: "Login button does nothing".to_string(),
            body: body.map(String::from),
            author: "alice".to_string(),
        }
    }

    #[test]
    fn includes_issue_metadata_and_commit_message() {
        let prompt = fix_prompt(&issue(Some("Clicking login has no effect.")));
        assert!(prompt.starts_with("Fix GitHub issue #42: Login button does nothing"));
        assert!(prompt.contains("Clicking login has no effect."));
        assert!(prompt.contains("\"fix: resolve issue #42 - Login button does nothing\""));
    }

    #[test]
    fn tolerates_missing_body() {
        let prompt = fix_prompt(&issue(Some("   ")));
        assert!(prompt.contains("no description provided"));
        assert_eq!(prompt, fix_prompt(&issue(None)));
    }

    #[test]
    fn long_titles_are_shortened_in_commit_subject() {
        let subject = commit_subject(&"a".repeat(80));
        assert_eq!(subject.chars().count(), 60);
        assert!(subject.ends_with("..."));
    }
}
