//! Durable record of which issues were fixed and which are backing off.
//!
//! The store is a single JSON document:
//!
//! ```text
//! {
//!   "processed_issues": [1, 2, 3],
//!   "failed_issues": { "43": { "attempts": 3, "last_attempt_at": ..., "next_retry_at": ... } },
//!   "last_updated": ...
//! }
//! ```
//!
//! Older stores that only carry `processed_issues` load as-is with no failures.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::context::ServiceContext;

/// Retry delay in minutes for the first, second, ... failure. Later attempts
/// reuse the last entry.
const BACKOFF_MINUTES: [i64; 6] = [5, 15, 45, 120, 360, 1440];

/// Retry delay after the `attempts`-th consecutive failure.
#[must_use]
pub fn backoff(attempts: u32) -> Duration {
    let index = usize::try_from(attempts.saturating_sub(1))
        .unwrap_or(usize::MAX)
        .min(BACKOFF_MINUTES.len() - 1);
    Duration::minutes(BACKOFF_MINUTES[index])
}

/// Failure history of one issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Consecutive failed attempts, at least 1.
    pub attempts: u32,
    /// When the most recent attempt failed.
    pub last_attempt_at: DateTime<Utc>,
    /// Earliest time the issue becomes eligible again.
    pub next_retry_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerState {
    #[serde(rename = "processed_issues", default)]
    processed: BTreeSet<u64>,
    #[serde(rename = "failed_issues", default)]
    failed: BTreeMap<u64, FailureRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_updated: Option<DateTime<Utc>>,
}

/// Errors from persisting the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The state could not be encoded.
    #[error("failed to encode ledger: {0}")]
    Encode(#[from] serde_json::Error),
    /// The store could not be written or swapped into place.
    #[error("failed to write ledger {}: {reason}", .path.display())]
    Write {
        /// Store location.
        path: PathBuf,
        /// Underlying filesystem error.
        reason: String,
    },
}

/// Per-issue processing state, persisted after every change.
///
/// An issue is in at most one of two states: processed (terminal) or failed
/// (retried after a backoff). Issues the ledger has never seen are eligible.
pub struct Ledger<'a> {
    ctx: &'a ServiceContext,
    path: PathBuf,
    state: LedgerState,
}

impl<'a> Ledger<'a> {
    /// Loads the ledger stored at `path`.
    ///
    /// A missing store starts empty. So does an unreadable or corrupt one,
    /// after logging a warning.
    #[must_use]
    pub fn load(ctx: &'a ServiceContext, path: &Path) -> Self {
        let state = if ctx.fs.exists(path) {
            match ctx.fs.read_to_string(path) {
                Ok(raw) => match serde_json::from_str::<LedgerState>(&raw) {
                    Ok(state) => normalize(state),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "ledger is corrupt, starting empty");
                        LedgerState::default()
                    }
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ledger is unreadable, starting empty");
                    LedgerState::default()
                }
            }
        } else {
            info!(path = %path.display(), "no ledger found, starting empty");
            LedgerState::default()
        };

        debug!(
            processed = state.processed.len(),
            failed = state.failed.len(),
            "ledger loaded"
        );
        Self { ctx, path: path.to_path_buf(), state }
    }

    /// Location of the store.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if `id` was fixed.
    #[must_use]
    pub fn is_processed(&self, id: u64) -> bool {
        self.state.processed.contains(&id)
    }

    /// Returns `true` if `id` should be attempted now.
    ///
    /// Processed issues never are; unseen issues always are; failed issues
    /// are once their retry time has come.
    #[must_use]
    pub fn should_retry(&self, id: u64) -> bool {
        if self.is_processed(id) {
            return false;
        }
        self.state
            .failed
            .get(&id)
            .map_or(true, |record| self.ctx.clock.now() >= record.next_retry_at)
    }

    /// Failure history of `id`, if it is backing off.
    #[must_use]
    pub fn failure(&self, id: u64) -> Option<FailureRecord> {
        self.state.failed.get(&id).copied()
    }

    /// Number of processed issues.
    #[must_use]
    pub fn processed_count(&self) -> usize {
        self.state.processed.len()
    }

    /// Number of issues backing off.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.state.failed.len()
    }

    /// Failed issues whose retry time is still in the future, soonest first.
    #[must_use]
    pub fn pending_retries(&self) -> Vec<(u64, FailureRecord)> {
        let now = self.ctx.clock.now();
        let mut pending: Vec<(u64, FailureRecord)> = self
            .state
            .failed
            .iter()
            .filter(|(_, record)| record.next_retry_at > now)
            .map(|(id, record)| (*id, *record))
            .collect();
        pending.sort_by_key(|(id, record)| (record.next_retry_at, *id));
        pending
    }

    /// When the store was last written.
    #[must_use]
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.state.last_updated
    }

    /// Marks `id` as fixed, forgetting any failure history.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written. The in-memory state
    /// keeps the change.
    pub fn mark_processed(&mut self, id: u64) -> Result<(), LedgerError> {
        self.state.processed.insert(id);
        self.state.failed.remove(&id);
        info!(issue = id, "marked processed");
        self.persist()
    }

    /// Records a failed attempt on `id` and schedules its retry.
    ///
    /// Returns the updated record, or `None` when `id` is already processed,
    /// in which case nothing changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn mark_failed(&mut self, id: u64) -> Result<Option<FailureRecord>, LedgerError> {
        if self.is_processed(id) {
            warn!(issue = id, "ignoring failure for an already processed issue");
            return Ok(None);
        }

        let now = self.ctx.clock.now();
        let attempts = self.state.failed.get(&id).map_or(1, |r| r.attempts.saturating_add(1));
        let record =
            FailureRecord { attempts, last_attempt_at: now, next_retry_at: now + backoff(attempts) };
        self.state.failed.insert(id, record);
        info!(
            issue = id,
            attempts,
            next_retry_at = %record.next_retry_at.to_rfc3339(),
            "marked failed"
        );
        self.persist()?;
        Ok(Some(record))
    }

    /// Keeps only the `keep` highest processed issue numbers.
    ///
    /// Returns how many entries were dropped. The store is only rewritten
    /// when something was dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn prune(&mut self, keep: usize) -> Result<usize, LedgerError> {
        let excess = self.state.processed.len().saturating_sub(keep);
        if excess == 0 {
            return Ok(0);
        }
        self.state.processed = self.state.processed.iter().rev().take(keep).copied().collect();
        info!(removed = excess, kept = self.state.processed.len(), "pruned processed issues");
        self.persist()?;
        Ok(excess)
    }

    /// Writes the full state next to the store and renames it into place.
    fn persist(&mut self) -> Result<(), LedgerError> {
        self.state.last_updated = Some(self.ctx.clock.now());
        let json = serde_json::to_string_pretty(&self.state)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        self.ctx
            .fs
            .write(&tmp, &json)
            .and_then(|()| self.ctx.fs.rename(&tmp, &self.path))
            .map_err(|e| LedgerError::Write { path: self.path.clone(), reason: e.to_string() })
    }
}

/// Drops failure records for processed issues.
fn normalize(mut state: LedgerState) -> LedgerState {
    let processed = &state.processed;
    state.failed.retain(|id, _| !processed.contains(id));
    state
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::adapters::memory::MemoryPorts;

    const STORE: &str = "/data/processed_issues.json";

    fn ports() -> MemoryPorts {
        MemoryPorts::new("main", Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap())
    }

    #[test]
    fn backoff_follows_schedule_and_caps_at_a_day() {
        let minutes: Vec<i64> = (1..=8).map(|n| backoff(n).num_minutes()).collect();
        assert_eq!(minutes, vec![5, 15, 45, 120, 360, 1440, 1440, 1440]);
        assert_eq!(backoff(u32::MAX).num_minutes(), 1440);
    }

    #[test]
    fn unseen_issue_is_eligible() {
        let ports = ports();
        let ctx = ServiceContext::in_memory(&ports);
        let ledger = Ledger::load(&ctx, Path::new(STORE));
        assert!(ledger.should_retry(77));
        assert!(!ledger.is_processed(77));
    }

    #[test]
    fn processed_is_sticky() {
        let ports = ports();
        let ctx = ServiceContext::in_memory(&ports);
        let mut ledger = Ledger::load(&ctx, Path::new(STORE));

        ledger.mark_failed(5).unwrap();
        ledger.mark_processed(5).unwrap();
        assert!(ledger.failure(5).is_none());

        assert_eq!(ledger.mark_failed(5).unwrap(), None);
        ports.clock.advance(Duration::days(30));
        assert!(ledger.is_processed(5));
        assert!(!ledger.should_retry(5));
        assert_eq!(ledger.failed_count(), 0);
    }

    #[test]
    fn consecutive_failures_widen_the_retry_window() {
        let ports = ports();
        let ctx = ServiceContext::in_memory(&ports);
        let mut ledger = Ledger::load(&ctx, Path::new(STORE));

        for expected in [5, 15, 45, 120, 360, 1440, 1440] {
            let record = ledger.mark_failed(43).unwrap().unwrap();
            assert_eq!((record.next_retry_at - record.last_attempt_at).num_minutes(), expected);
            assert!(!ledger.should_retry(43));

            ports.clock.advance(Duration::minutes(expected - 1));
            assert!(!ledger.should_retry(43));
            ports.clock.advance(Duration::minutes(1));
            assert!(ledger.should_retry(43));
        }
        assert_eq!(ledger.failure(43).unwrap().attempts, 7);
    }

    #[test]
    fn prune_keeps_highest_numbers() {
        let ports = ports();
        let ctx = ServiceContext::in_memory(&ports);
        let mut ledger = Ledger::load(&ctx, Path::new(STORE));
        for id in [1, 2, 3, 5, 9] {
            ledger.mark_processed(id).unwrap();
        }

        assert_eq!(ledger.prune(2).unwrap(), 3);
        assert_eq!(ledger.processed_count(), 2);
        assert!(ledger.is_processed(5) && ledger.is_processed(9));
        assert!(!ledger.is_processed(3));
        assert_eq!(ledger.prune(2).unwrap(), 0);
    }

    #[test]
    fn state_survives_reload() {
        let ports = ports();
        let ctx = ServiceContext::in_memory(&ports);
        let mut ledger = Ledger::load(&ctx, Path::new(STORE));
        ledger.mark_processed(1).unwrap();
        let record = ledger.mark_failed(2).unwrap().unwrap();

        let reloaded = Ledger::load(&ctx, Path::new(STORE));
        assert!(reloaded.is_processed(1));
        assert_eq!(reloaded.failure(2), Some(record));
        assert!(reloaded.last_updated().is_some());
        assert_eq!(ports.fs.files(), vec![PathBuf::from(STORE)]);
    }

    #[test]
    fn store_uses_documented_layout() {
        let ports = ports();
        let ctx = ServiceContext::in_memory(&ports);
        let mut ledger = Ledger::load(&ctx, Path::new(STORE));
        ledger.mark_failed(43).unwrap();

        let raw = ctx.fs.read_to_string(Path::new(STORE)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["processed_issues"], serde_json::json!([]));
        assert_eq!(json["failed_issues"]["43"]["attempts"], 1);
    }

    #[test]
    fn loads_legacy_store() {
        let ports = ports();
        let ctx = ServiceContext::in_memory(&ports);
        ctx.fs.write(Path::new(STORE), r#"{"processed_issues": [4, 8]}"#).unwrap();

        let ledger = Ledger::load(&ctx, Path::new(STORE));
        assert_eq!(ledger.processed_count(), 2);
        assert_eq!(ledger.failed_count(), 0);
    }

    #[test]
    fn corrupt_store_starts_empty() {
        let ports = ports();
        let ctx = ServiceContext::in_memory(&ports);
        ctx.fs.write(Path::new(STORE), "{not json").unwrap();

        let ledger = Ledger::load(&ctx, Path::new(STORE));
        assert_eq!(ledger.processed_count(), 0);
        assert!(ledger.should_retry(1));
    }

    #[test]
    fn overlapping_entries_resolve_to_processed() {
        let ports = ports();
        let ctx = ServiceContext::in_memory(&ports);
        let raw = r#"{"processed_issues":[6],"failed_issues":{"6":{"attempts":1,
            "last_attempt_at":"2024-06-15T09:00:00Z","next_retry_at":"2024-06-15T09:05:00Z"}}}"#;
        ctx.fs.write(Path::new(STORE), raw).unwrap();

        let ledger = Ledger::load(&ctx, Path::new(STORE));
        assert!(ledger.is_processed(6));
        assert!(ledger.failure(6).is_none());
    }

    #[test]
    fn write_failure_is_reported() {
        let ports = ports();
        let ctx = ServiceContext::in_memory(&ports);
        let mut ledger = Ledger::load(&ctx, Path::new(STORE));
        ports.fs.fail_writes(true);

        let err = ledger.mark_processed(1).unwrap_err();
        assert!(matches!(err, LedgerError::Write { .. }));
        assert!(ledger.is_processed(1));
    }

    #[test]
    fn pending_retries_are_sorted_by_due_time() {
        let ports = ports();
        let ctx = ServiceContext::in_memory(&ports);
        let mut ledger = Ledger::load(&ctx, Path::new(STORE));
        ledger.mark_failed(10).unwrap();
        ledger.mark_failed(10).unwrap();
        ledger.mark_failed(11).unwrap();

        let ids: Vec<u64> = ledger.pending_retries().iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![11, 10]);

        ports.clock.advance(Duration::minutes(5));
        let ids: Vec<u64> = ledger.pending_retries().iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![10]);
    }
}
