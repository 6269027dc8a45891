use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use gitopsdb_core::OperationState;
use gitopsdb_storage::OperationRepository;

use crate::error::LifecycleError;

/// What to do with an `In_Progress` operation whose claiming worker is
/// presumed dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleAction {
    /// Put it back in `Waiting` so another worker retries it.
    Requeue,
    /// Fail it outright with a reclamation message.
    Fail,
}

#[derive(Debug, Clone)]
pub struct ReclamationPolicy {
    /// An `In_Progress` row older than this (by `last_state_update`) is
    /// considered abandoned.
    pub staleness: Duration,
    /// Terminal rows older than this are deleted. Operations are
    /// short-lived bookkeeping, not an audit log.
    pub retention: Duration,
    pub on_stale: StaleAction,
}

impl Default for ReclamationPolicy {
    fn default() -> Self {
        Self {
            staleness: Duration::minutes(10),
            retention: Duration::hours(1),
            on_stale: StaleAction::Requeue,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub requeued: usize,
    pub failed: usize,
    /// Stale candidates a live worker finalized before our swap landed.
    /// Expected under the claim discipline, never treated as corruption.
    pub lost_races: usize,
    pub deleted: usize,
}

/// One reclamation pass. Uses the same compare-and-swap discipline as
/// claiming, so a worker that is in fact alive and about to finalize
/// simply wins the race.
pub fn sweep_once<S: OperationRepository>(
    store: &mut S,
    policy: &ReclamationPolicy,
    now: DateTime<Utc>,
) -> Result<SweepReport, LifecycleError> {
    let mut report = SweepReport::default();

    let stale_before = now - policy.staleness;
    for op in store.list_stale_in_progress(stale_before)? {
        let (to, message) = match policy.on_stale {
            StaleAction::Requeue => (OperationState::Waiting, None),
            StaleAction::Fail => (
                OperationState::Failed,
                Some("reclaimed: claiming worker presumed dead"),
            ),
        };
        let moved = store.compare_and_swap_operation_state(
            &op.operation_id,
            OperationState::InProgress,
            to,
            message,
            now,
        )?;
        if moved {
            match to {
                OperationState::Waiting => report.requeued += 1,
                _ => report.failed += 1,
            }
            info!(
                operation = %op.operation_id,
                state = to.as_str(),
                "reclaimed stale operation"
            );
        } else {
            report.lost_races += 1;
        }
    }

    report.deleted = store.delete_terminal_operations_before(now - policy.retention)?;
    if report.deleted > 0 {
        debug!(deleted = report.deleted, "garbage-collected terminal operations");
    }

    Ok(report)
}

/// Fixed-interval wrapper around [`sweep_once`]. A failed pass is logged
/// and retried on the next tick; the sweep never crashes its process.
pub struct Sweeper {
    pub policy: ReclamationPolicy,
    pub interval: std::time::Duration,
}

impl Sweeper {
    pub fn new(policy: ReclamationPolicy) -> Self {
        Self {
            policy,
            interval: std::time::Duration::from_secs(60),
        }
    }

    pub fn run<S: OperationRepository>(&self, store: &mut S) -> ! {
        loop {
            match sweep_once(store, &self.policy, Utc::now()) {
                Ok(report) => debug!(?report, "sweep tick"),
                Err(err) => warn!(error = %err, "sweep failed; retrying next tick"),
            }
            std::thread::sleep(self.interval);
        }
    }
}
