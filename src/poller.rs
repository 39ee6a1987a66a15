//! The poll loop: fetch issues, fix the eligible ones, report back.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::context::ServiceContext;
use crate::fixer::FixInvoker;
use crate::ledger::Ledger;
use crate::outcome::{Failure, Outcome};
use crate::ports::issues::IssueRef;
use crate::workspace::{Workspace, WorkspaceError};

const IN_PROGRESS: &str = "🤖 Automated fix in progress. A coding agent is analyzing this issue...";
const CLOSING_NOTE: &str = "🤖 Issue automatically resolved by the issue-fixer automation.";

/// Where the poller is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    /// Between cycles.
    Idle,
    /// Listing open issues.
    Fetching,
    /// The last fetch found nothing eligible.
    NoWork,
    /// Working on the given issue.
    Processing(u64),
}

/// Tally of one cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Open issues by the target user that were listed.
    pub fetched: usize,
    /// Issues the ledger allowed to be attempted.
    pub eligible: usize,
    /// Issues fixed this cycle.
    pub succeeded: usize,
    /// Issues that failed this cycle.
    pub failed: usize,
}

/// Drives issues through workspace preparation, the coding agent and the
/// ledger, one at a time.
pub struct Poller<'a> {
    ctx: &'a ServiceContext,
    target_user: String,
    scan_depth: usize,
    keep_processed: usize,
    poll_interval: Duration,
    maintenance_interval: chrono::Duration,
    last_maintenance: Option<DateTime<Utc>>,
    ledger: Ledger<'a>,
    workspace: Workspace<'a>,
    invoker: FixInvoker<'a>,
    state: CycleState,
}

impl<'a> Poller<'a> {
    /// Builds a poller from `settings`, loading the ledger.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext, settings: &Settings) -> Self {
        Self {
            ctx,
            target_user: settings.target_user.clone(),
            scan_depth: settings.scan_depth,
            keep_processed: settings.keep_processed,
            poll_interval: settings.poll_interval(),
            maintenance_interval: chrono::Duration::hours(24),
            last_maintenance: None,
            ledger: Ledger::load(ctx, &settings.ledger_path),
            workspace: Workspace::new(
                ctx,
                &settings.repo_dir,
                &settings.authenticated_repo_url(),
                &settings.trunk_branch,
            ),
            invoker: FixInvoker::new(ctx, &settings.trunk_branch, settings.agent_timeout()),
            state: CycleState::Idle,
        }
    }

    /// The ledger this poller records into.
    #[must_use]
    pub fn ledger(&self) -> &Ledger<'a> {
        &self.ledger
    }

    /// Current position within the cycle.
    #[must_use]
    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Clones or refreshes the working copy.
    ///
    /// # Errors
    ///
    /// Returns an error if no usable working copy can be set up.
    pub async fn initialize(&mut self) -> Result<(), WorkspaceError> {
        self.workspace.initialize().await
    }

    /// Runs one cycle: list, filter through the ledger, process each eligible
    /// issue in listing order, then prune the ledger if it is due.
    ///
    /// # Errors
    ///
    /// Returns an error if the issues cannot be listed. The ledger is left
    /// untouched in that case.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, String> {
        self.state = CycleState::Fetching;
        let issues =
            match self.ctx.issues.list_open_issues(&self.target_user, self.scan_depth).await {
                Ok(issues) => issues,
                Err(e) => {
                    self.state = CycleState::Idle;
                    return Err(format!("Failed to list issues: {e}"));
                }
            };

        let mut report = CycleReport { fetched: issues.len(), ..CycleReport::default() };
        let eligible: Vec<IssueRef> =
            issues.into_iter().filter(|issue| self.ledger.should_retry(issue.number)).collect();
        report.eligible = eligible.len();
        debug!(fetched = report.fetched, eligible = report.eligible, "issues listed");

        if eligible.is_empty() {
            self.state = CycleState::NoWork;
            info!(fetched = report.fetched, "no issues to process");
        }
        for issue in &eligible {
            self.state = CycleState::Processing(issue.number);
            if self.process_issue(issue).await {
                report.succeeded += 1;
            } else {
                report.failed += 1;
            }
        }

        self.maintain();
        self.state = CycleState::Idle;
        Ok(report)
    }

    /// Processes one issue end to end and reports on it. Returns `true` on
    /// success.
    async fn process_issue(&mut self, issue: &IssueRef) -> bool {
        let number = issue.number;
        info!(issue = number, title = %issue.title, "processing issue");
        self.notify(number, IN_PROGRESS).await;

        match self.attempt(issue).await {
            Ok(message) => {
                info!(issue = number, "issue fixed");
                self.notify(number, &format!("✅ Automated fix completed! {message}")).await;
                if let Err(e) = self.ctx.issues.close(number, CLOSING_NOTE).await {
                    warn!(issue = number, error = %e, "failed to close issue");
                }
                if let Err(e) = self.ledger.mark_processed(number) {
                    error!(issue = number, error = %e, "failed to record success");
                }
                true
            }
            Err(failure) => {
                error!(issue = number, kind = %failure.kind, error = %failure.message, "issue failed");
                let record = self.ledger.mark_failed(number).unwrap_or_else(|e| {
                    error!(issue = number, error = %e, "failed to record failure");
                    None
                });

                let mut text = format!("❌ Automated fix failed: {failure}\n\n");
                if let Some(record) = record {
                    text.push_str(&format!(
                        "Attempt {} failed. The next automatic retry is after {}.\n\n",
                        record.attempts,
                        record.next_retry_at.format("%Y-%m-%d %H:%M UTC"),
                    ));
                }
                text.push_str("Please review and fix manually.");
                self.notify(number, &text).await;
                false
            }
        }
    }

    async fn attempt(&mut self, issue: &IssueRef) -> Outcome {
        let lease = self
            .workspace
            .prepare_for_issue(issue.number)
            .await
            .map_err(|e| Failure::workspace(e.to_string()))?;
        let outcome = self.invoker.run(lease.path(), issue).await;
        lease.release(outcome.is_ok()).await;
        outcome
    }

    async fn notify(&self, number: u64, text: &str) {
        if let Err(e) = self.ctx.issues.comment(number, text).await {
            warn!(issue = number, error = %e, "failed to comment on issue");
        }
    }

    /// Prunes the ledger when the maintenance interval has passed.
    fn maintain(&mut self) {
        let now = self.ctx.clock.now();
        let due = self.last_maintenance.map_or(true, |last| now - last >= self.maintenance_interval);
        if !due {
            return;
        }
        self.last_maintenance = Some(now);
        match self.ledger.prune(self.keep_processed) {
            Ok(0) => debug!("ledger within retention limit"),
            Ok(removed) => info!(removed, "pruned ledger"),
            Err(e) => error!(error = %e, "failed to prune ledger"),
        }
    }

    /// Runs a cycle immediately and then every poll interval until
    /// `shutdown` completes. Shutdown is observed between cycles.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            user = %self.target_user,
            interval_secs = self.poll_interval.as_secs(),
            "polling for issues"
        );
        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    match self.run_cycle().await {
                        Ok(report) => info!(
                            fetched = report.fetched,
                            eligible = report.eligible,
                            succeeded = report.succeeded,
                            failed = report.failed,
                            "cycle complete"
                        ),
                        Err(e) => error!(error = %e, "cycle failed"),
                    }
                }
            }
        }
    }

    /// Polls until Ctrl-C.
    pub async fn run(&mut self) {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::adapters::memory::MemoryPorts;
    use crate::ports::agent::AgentError;

    fn settings() -> Settings {
        Settings::from_lookup(|name| {
            let value = match name {
                "GITHUB_TOKEN" => "ghp_test",
                "REPO_OWNER" => "acme",
                "REPO_NAME" => "widgets",
                "TARGET_USER" => "alice",
                "REPO_DIR" => "/srv/repo",
                "LEDGER_PATH" => "/data/ledger.json",
                "KEEP_PROCESSED" => "2",
                _ => return None,
            };
            Some(value.to_string())
        })
        .unwrap()
    }

    fn ports() -> MemoryPorts {
        MemoryPorts::new("main", Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn skips_other_authors_and_processed_issues() {
        let ports = ports();
        ports.tracker.open_issue(1, "mine", "alice");
        ports.tracker.open_issue(2, "theirs", "bob");
        let ctx = ServiceContext::in_memory(&ports);
        let mut poller = Poller::new(&ctx, &settings());
        poller.initialize().await.unwrap();

        let report = poller.run_cycle().await.unwrap();
        assert_eq!(report, CycleReport { fetched: 1, eligible: 1, succeeded: 1, failed: 0 });
        assert!(ports.tracker.comments_on(2).is_empty());
        assert_eq!(poller.state(), CycleState::Idle);

        ports.tracker.open_issue(1, "reopened", "alice");
        let report = poller.run_cycle().await.unwrap();
        assert_eq!(report.eligible, 0);
    }

    #[tokio::test]
    async fn listing_failure_leaves_ledger_alone() {
        let ports = ports();
        ports.tracker.open_issue(1, "mine", "alice");
        ports.tracker.fail_listing(true);
        let ctx = ServiceContext::in_memory(&ports);
        let mut poller = Poller::new(&ctx, &settings());
        poller.initialize().await.unwrap();

        assert!(poller.run_cycle().await.is_err());
        assert_eq!(poller.ledger().failed_count(), 0);
        assert!(ports.fs.files().is_empty());
        assert_eq!(poller.state(), CycleState::Idle);
    }

    #[tokio::test]
    async fn workspace_failure_is_recorded_as_failure() {
        let ports = ports();
        ports.tracker.open_issue(9, "mine", "alice");
        let ctx = ServiceContext::in_memory(&ports);
        let mut poller = Poller::new(&ctx, &settings());
        poller.initialize().await.unwrap();
        ports.git.fail("create_branch", "invalid ref");

        let report = poller.run_cycle().await.unwrap();
        assert_eq!(report.failed, 1);
        assert!(ports.agent.runs().is_empty());
        let comments = ports.tracker.comments_on(9);
        assert!(comments.last().unwrap().contains("workspace failure"));
        assert!(comments.last().unwrap().contains("2024-06-15 10:05 UTC"));
        assert!(!ports.tracker.is_closed(9));
    }

    #[tokio::test]
    async fn comment_failures_do_not_change_the_outcome() {
        let ports = ports();
        ports.tracker.open_issue(4, "mine", "alice");
        ports.tracker.fail_comments(true);
        let ctx = ServiceContext::in_memory(&ports);
        let mut poller = Poller::new(&ctx, &settings());
        poller.initialize().await.unwrap();

        let report = poller.run_cycle().await.unwrap();
        assert_eq!(report.succeeded, 1);
        assert!(poller.ledger().is_processed(4));
    }

    #[tokio::test]
    async fn agent_failure_cleans_up_and_backs_off() {
        let ports = ports();
        ports.tracker.open_issue(5, "mine", "alice");
        ports.agent.edits(&ports.git);
        ports.agent.fail_with(AgentError::Exit { code: 1, diagnostic: "boom".to_string() });
        let ctx = ServiceContext::in_memory(&ports);
        let mut poller = Poller::new(&ctx, &settings());
        poller.initialize().await.unwrap();

        let report = poller.run_cycle().await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(poller.ledger().failure(5).unwrap().attempts, 1);
        assert!(!ports.git.has_branch("fix-issue-5"));
        assert!(!ports.git.is_dirty());
        assert!(!ports.git.was_pushed("fix-issue-5"));
    }

    #[tokio::test]
    async fn prunes_once_per_maintenance_interval() {
        let ports = ports();
        for number in 1..=3 {
            ports.tracker.open_issue(number, "mine", "alice");
        }
        let ctx = ServiceContext::in_memory(&ports);
        let mut poller = Poller::new(&ctx, &settings());
        poller.initialize().await.unwrap();

        poller.run_cycle().await.unwrap();
        assert_eq!(poller.ledger().processed_count(), 2);

        ports.tracker.open_issue(4, "mine", "alice");
        poller.run_cycle().await.unwrap();
        assert_eq!(poller.ledger().processed_count(), 3);

        ports.clock.advance(chrono::Duration::hours(24));
        poller.run_cycle().await.unwrap();
        assert_eq!(poller.ledger().processed_count(), 2);
        assert!(poller.ledger().is_processed(4));
    }

    #[tokio::test]
    async fn run_until_stops_between_cycles() {
        let ports = ports();
        ports.tracker.open_issue(6, "mine", "alice");
        let ctx = ServiceContext::in_memory(&ports);
        let mut poller = Poller::new(&ctx, &settings());
        poller.initialize().await.unwrap();

        poller.run_until(tokio::time::sleep(Duration::from_millis(50))).await;
        assert!(poller.ledger().is_processed(6));
        assert_eq!(poller.state(), CycleState::Idle);
    }
}
