//! Start-up configuration read from the environment.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

const REQUIRED: [&str; 4] = ["GITHUB_TOKEN", "REPO_OWNER", "REPO_NAME", "TARGET_USER"];

/// Largest page the issues API serves.
const MAX_SCAN_DEPTH: usize = 100;

/// Configuration problems that stop the process before it starts polling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// One or more required variables are unset or empty.
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    /// A variable is set to an unusable value.
    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// Value as given.
        value: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// Everything the service needs to know about its environment.
#[derive(Clone)]
pub struct Settings {
    /// Token for the GitHub API and for git over HTTPS.
    pub github_token: String,
    /// Owner of the watched repository.
    pub repo_owner: String,
    /// Name of the watched repository.
    pub repo_name: String,
    /// Only issues opened by this login are fixed.
    pub target_user: String,
    /// Minutes between poll cycles.
    pub poll_interval_minutes: u64,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// File that receives a copy of the log.
    pub log_file: PathBuf,
    /// Location of the persistent working copy.
    pub repo_dir: PathBuf,
    /// Location of the ledger store.
    pub ledger_path: PathBuf,
    /// Branch fixes are based on and merged into.
    pub trunk_branch: String,
    /// Coding agent executable.
    pub agent_command: String,
    /// Minutes the agent may spend on one issue.
    pub agent_timeout_minutes: u64,
    /// How many of the newest open issues each cycle looks at.
    pub scan_depth: usize,
    /// Processed entries kept when the ledger is pruned.
    pub keep_processed: usize,
    /// Base URL of the GitHub REST API.
    pub github_api_url: String,
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or any value is
    /// invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`, which maps a variable name to its
    /// value.
    ///
    /// Every missing required variable is reported at once. Empty values
    /// count as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or any value is
    /// invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
        };

        let missing: Vec<&'static str> =
            REQUIRED.iter().copied().filter(|name| get(*name).is_none()).collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }
        let required = |name: &str| get(name).unwrap_or_default();
        let text = |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());

        let settings = Self {
            github_token: required("GITHUB_TOKEN"),
            repo_owner: required("REPO_OWNER"),
            repo_name: required("REPO_NAME"),
            target_user: required("TARGET_USER"),
            poll_interval_minutes: positive(
                "POLL_INTERVAL_MINUTES",
                get("POLL_INTERVAL_MINUTES"),
                5,
            )?,
            log_level: text("LOG_LEVEL", "info"),
            log_file: PathBuf::from(text("LOG_FILE", "logs/automator.log")),
            repo_dir: PathBuf::from(text("REPO_DIR", "repo")),
            ledger_path: PathBuf::from(text("LEDGER_PATH", "data/processed_issues.json")),
            trunk_branch: text("TRUNK_BRANCH", "main"),
            agent_command: text("AGENT_COMMAND", "claude"),
            agent_timeout_minutes: positive(
                "AGENT_TIMEOUT_MINUTES",
                get("AGENT_TIMEOUT_MINUTES"),
                30,
            )?,
            scan_depth: positive("SCAN_DEPTH", get("SCAN_DEPTH"), 50)?,
            keep_processed: parse("KEEP_PROCESSED", get("KEEP_PROCESSED"), 1000)?,
            github_api_url: text("GITHUB_API_URL", "https://api.github.com"),
        };

        if settings.scan_depth > MAX_SCAN_DEPTH {
            return Err(ConfigError::Invalid {
                name: "SCAN_DEPTH",
                value: settings.scan_depth.to_string(),
                reason: format!("must be at most {MAX_SCAN_DEPTH}"),
            });
        }
        Ok(settings)
    }

    /// Public clone URL of the watched repository.
    #[must_use]
    pub fn repo_url(&self) -> String {
        format!("https://github.com/{}/{}.git", self.repo_owner, self.repo_name)
    }

    /// Clone URL carrying the token, used as the working copy's `origin`.
    #[must_use]
    pub fn authenticated_repo_url(&self) -> String {
        format!(
            "https://{}@github.com/{}/{}.git",
            self.github_token, self.repo_owner, self.repo_name
        )
    }

    /// Time between poll cycles.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_minutes.saturating_mul(60))
    }

    /// Time the agent may spend on one issue.
    #[must_use]
    pub fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_timeout_minutes.saturating_mul(60))
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("github_token", &"<redacted>")
            .field("repo_owner", &self.repo_owner)
            .field("repo_name", &self.repo_name)
            .field("target_user", &self.target_user)
            .field("poll_interval_minutes", &self.poll_interval_minutes)
            .field("log_level", &self.log_level)
            .field("log_file", &self.log_file)
            .field("repo_dir", &self.repo_dir)
            .field("ledger_path", &self.ledger_path)
            .field("trunk_branch", &self.trunk_branch)
            .field("agent_command", &self.agent_command)
            .field("agent_timeout_minutes", &self.agent_timeout_minutes)
            .field("scan_depth", &self.scan_depth)
            .field("keep_processed", &self.keep_processed)
            .field("github_api_url", &self.github_api_url)
            .finish()
    }
}

fn parse<T>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn positive<T>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Default + PartialEq,
    T::Err: fmt::Display,
{
    let raw = value.clone().unwrap_or_default();
    let parsed = parse(name, value, default)?;
    if parsed == T::default() {
        return Err(ConfigError::Invalid { name, value: raw, reason: "must be positive".into() });
    }
    Ok(parsed)
}
