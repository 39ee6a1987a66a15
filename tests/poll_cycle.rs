//! End-to-end poll cycles over the in-memory adapters.

use chrono::{Duration, TimeZone, Utc};
use issue_fixer::adapters::memory::MemoryPorts;
use issue_fixer::config::Settings;
use issue_fixer::context::ServiceContext;
use issue_fixer::ledger::Ledger;
use issue_fixer::poller::{CycleReport, Poller};
use issue_fixer::ports::agent::{AgentError, AgentReport};

fn settings() -> Settings {
    Settings::from_lookup(|name| {
        let value = match name {
            "GITHUB_TOKEN" => "ghp_test",
            "REPO_OWNER" => "acme",
            "REPO_NAME" => "widgets",
            "TARGET_USER" => "alice",
            "REPO_DIR" => "/srv/repo",
            "LEDGER_PATH" => "/data/processed_issues.json",
            _ => return None,
        };
        Some(value.to_string())
    })
    .unwrap()
}

fn ports() -> MemoryPorts {
    let ports = MemoryPorts::new("main", Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap());
    ports.agent.edits(&ports.git);
    ports
}

#[tokio::test]
async fn fixed_issue_is_closed_and_never_retried() {
    let ports = ports();
    ports.tracker.open_issue(42, "Crash on save", "alice");
    ports.agent.succeed_with(AgentReport {
        summary: Some("Guarded the null path".to_string()),
        cost_usd: Some(0.42),
    });
    let ctx = ServiceContext::in_memory(&ports);
    let settings = settings();
    let mut poller = Poller::new(&ctx, &settings);
    poller.initialize().await.unwrap();

    let report = poller.run_cycle().await.unwrap();
    assert_eq!(report, CycleReport { fetched: 1, eligible: 1, succeeded: 1, failed: 0 });

    assert!(ports.tracker.is_closed(42));
    let comments = ports.tracker.comments_on(42);
    assert!(comments[0].contains("in progress"));
    assert!(comments[1].starts_with("✅ Automated fix completed!"));
    assert!(comments[1].contains("https://example.test/pull/1"));

    assert!(ports.git.was_pushed("fix-issue-42"));
    assert_eq!(ports.git.checked_out().as_deref(), Some("main"));
    assert!(!ports.git.is_dirty());
    assert!(ports.git.remote_url().unwrap().contains("ghp_test@github.com/acme/widgets"));

    let reloaded = Ledger::load(&ctx, &settings.ledger_path);
    assert!(reloaded.is_processed(42));
    assert!(!reloaded.should_retry(42));
}

#[tokio::test]
async fn failing_issue_backs_off_between_cycles() {
    let ports = ports();
    ports.tracker.open_issue(43, "Flaky export", "alice");
    ports.agent.always_fail(AgentError::Exit { code: 1, diagnostic: "tests failed".to_string() });
    let ctx = ServiceContext::in_memory(&ports);
    let mut poller = Poller::new(&ctx, &settings());
    poller.initialize().await.unwrap();

    for wait in [0, 5, 15] {
        ports.clock.advance(Duration::minutes(wait));
        let report = poller.run_cycle().await.unwrap();
        assert_eq!(report.failed, 1);
    }

    let record = poller.ledger().failure(43).unwrap();
    assert_eq!(record.attempts, 3);
    assert_eq!(record.next_retry_at - record.last_attempt_at, Duration::minutes(45));
    assert!(!ports.git.has_branch("fix-issue-43"));
    assert!(!ports.tracker.is_closed(43));

    ports.clock.advance(Duration::minutes(10));
    let report = poller.run_cycle().await.unwrap();
    assert_eq!(report, CycleReport { fetched: 1, eligible: 0, succeeded: 0, failed: 0 });

    ports.clock.advance(Duration::minutes(40));
    let report = poller.run_cycle().await.unwrap();
    assert_eq!(report.eligible, 1);
    assert_eq!(poller.ledger().failure(43).unwrap().attempts, 4);

    let last = ports.tracker.comments_on(43).pop().unwrap();
    assert!(last.starts_with("❌ Automated fix failed: agent failure"));
    assert!(last.contains("Attempt 4 failed"));
    assert!(last.contains("2024-06-15 13:10 UTC"));
}

#[tokio::test]
async fn failed_issue_that_later_succeeds_is_processed() {
    let ports = ports();
    ports.tracker.open_issue(44, "Typo in banner", "alice");
    ports.agent.fail_with(AgentError::TimedOut(std::time::Duration::from_secs(1800)));
    let ctx = ServiceContext::in_memory(&ports);
    let mut poller = Poller::new(&ctx, &settings());
    poller.initialize().await.unwrap();

    assert_eq!(poller.run_cycle().await.unwrap().failed, 1);
    assert!(ports.tracker.comments_on(44)[1].contains("timed out after 30 minutes"));

    ports.clock.advance(Duration::minutes(5));
    assert_eq!(poller.run_cycle().await.unwrap().succeeded, 1);
    assert!(poller.ledger().is_processed(44));
    assert!(poller.ledger().failure(44).is_none());
}
