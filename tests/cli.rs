//! Integration tests for top-level CLI behavior.

use std::path::Path;
use std::process::Command;

fn fixer(cwd: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_issue-fixer"));
    command.env_clear().current_dir(cwd);
    command
}

fn configured(cwd: &Path) -> Command {
    let mut command = fixer(cwd);
    command
        .env("GITHUB_TOKEN", "ghp_test")
        .env("REPO_OWNER", "acme")
        .env("REPO_NAME", "widgets")
        .env("TARGET_USER", "alice")
        .env("LEDGER_PATH", cwd.join("ledger.json"))
        .env("LOG_FILE", cwd.join("logs").join("fixer.log"));
    command
}

#[test]
fn help_lists_subcommands() {
    let dir = tempfile::tempdir().unwrap();
    let output = fixer(dir.path()).arg("--help").output().expect("failed to run binary");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    for name in ["run", "once", "status", "prune"] {
        assert!(stdout.contains(name), "help is missing {name}");
    }
}

#[test]
fn unknown_subcommand_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = fixer(dir.path()).arg("deploy").output().expect("failed to run binary");
    assert!(!output.status.success());
}

#[test]
fn missing_configuration_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let output = fixer(dir.path()).arg("once").output().expect("failed to run binary");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("GITHUB_TOKEN"));
    assert!(stderr.contains("TARGET_USER"));
}

#[test]
fn malformed_dotenv_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".env"), "GITHUB_TOKEN=\"unterminated\n").unwrap();
    let output = configured(dir.path()).arg("status").output().expect("failed to run binary");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains(".env"), "{stderr}");
}

#[test]
fn invalid_number_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let output = configured(dir.path())
        .env("POLL_INTERVAL_MINUTES", "often")
        .arg("status")
        .output()
        .expect("failed to run binary");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("POLL_INTERVAL_MINUTES"));
}

#[test]
fn status_reads_existing_ledger() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ledger.json"), r#"{"processed_issues": [3, 7]}"#).unwrap();

    let output = configured(dir.path()).arg("status").output().expect("failed to run binary");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("Processed issues: 2"));
    assert!(stdout.contains("Failed issues: 0"));
    assert!(dir.path().join("logs").join("fixer.log").exists());
}

#[test]
fn prune_keeps_newest_issues() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = dir.path().join("ledger.json");
    std::fs::write(&ledger, r#"{"processed_issues": [1, 2, 3, 5, 9]}"#).unwrap();

    let output = configured(dir.path())
        .args(["prune", "--keep", "2"])
        .output()
        .expect("failed to run binary");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("Pruned 3 processed issue(s); 2 remain."));

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&ledger).unwrap()).unwrap();
    assert_eq!(saved["processed_issues"], serde_json::json!([5, 9]));
}
