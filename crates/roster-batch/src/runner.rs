//! The batch reconciliation orchestrator.

use roster_remote::{
    AccessLevel, BatchResult, ExpiresAt, FailedItem, ProjectRef, RemoteDirectory,
};
use roster_storage::UserId;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::classify::{classify_add_failure, Classification};
use crate::progress::{BatchKind, ProgressReporter, ProgressState};
use crate::targets::{dedup_targets, Target};
use crate::BatchError;

/// Failure reason for requested ids a bulk remove result does not mention.
pub const UNREPORTED_REASON: &str = "not reported by remote";

/// Runs one ADD or REMOVE batch at a time against a remote directory.
///
/// Items are processed sequentially; there is no cancellation. Progress
/// snapshots are pushed to the reporter on the caller's task.
pub struct BatchRunner {
    remote: Arc<dyn RemoteDirectory>,
    state: Mutex<ProgressState>,
}

impl BatchRunner {
    pub fn new(remote: Arc<dyn RemoteDirectory>) -> Self {
        Self {
            remote,
            state: Mutex::new(ProgressState::idle()),
        }
    }

    /// Snapshot of the current (or last finished) batch.
    pub fn state(&self) -> ProgressState {
        self.lock().clone()
    }

    /// Dismiss a finished result and return to idle.
    pub fn reset(&self) -> Result<(), BatchError> {
        let mut state = self.lock();
        if state.is_running() {
            return Err(BatchError::AlreadyRunning);
        }
        *state = ProgressState::idle();
        Ok(())
    }

    /// Add each target to `project`, one call at a time, in input order.
    ///
    /// Per-item failures are classified and recorded; they never abort the
    /// batch. Repeated user ids are processed once.
    pub async fn run_add_batch(
        &self,
        project: &ProjectRef,
        targets: &[Target],
        access_level: AccessLevel,
        expires_at: Option<ExpiresAt>,
        reporter: &dyn ProgressReporter,
    ) -> Result<BatchResult, BatchError> {
        if project.is_unresolved() {
            return Err(BatchError::UnresolvedProject);
        }
        let targets = dedup_targets(targets.iter().cloned());
        if targets.is_empty() {
            return Err(BatchError::EmptyTargets);
        }

        let run = self.begin(BatchKind::Add, targets.len())?;
        info!(
            project = %project,
            total = targets.len(),
            access_level = %access_level,
            "Starting add batch"
        );
        run.publish(reporter);

        for target in &targets {
            run.update(|s| s.begin_item(target.display_label()));
            run.publish(reporter);

            match self
                .remote
                .add_member(project, target.user_id, access_level, expires_at)
                .await
            {
                Ok(()) => {
                    debug!(user_id = %target.user_id, "Added member");
                    run.update(ProgressState::record_success);
                }
                Err(e) => match classify_add_failure(&e.to_string()) {
                    Classification::AlreadyMember => {
                        debug!(user_id = %target.user_id, "Already a member");
                        run.update(ProgressState::record_success);
                    }
                    other => {
                        let reason = other.into_reason().unwrap_or_default();
                        warn!(user_id = %target.user_id, reason = %reason, "Add failed");
                        run.update(|s| s.record_failure(target.user_id, reason));
                    }
                },
            }
            run.publish(reporter);
        }

        let state = run.finish(reporter);
        let failed_ids: BTreeSet<UserId> = state.failed_so_far().iter().map(|f| f.user_id).collect();
        let result = BatchResult {
            success_user_ids: targets
                .iter()
                .map(|t| t.user_id)
                .filter(|id| !failed_ids.contains(id))
                .collect(),
            failed: state.failed_so_far().to_vec(),
        };
        info!(
            project = %project,
            succeeded = result.success_count(),
            failed = result.failed_count(),
            "Add batch finished"
        );
        Ok(result)
    }

    /// Remove `user_ids` from `project` in a single remote call.
    ///
    /// Reported outcomes are returned unchanged; requested ids the remote
    /// does not mention are recorded as failed with [`UNREPORTED_REASON`].
    /// A call that cannot be completed fails the whole batch and leaves the
    /// runner idle.
    pub async fn run_remove_batch(
        &self,
        project: &ProjectRef,
        user_ids: &BTreeSet<UserId>,
        reporter: &dyn ProgressReporter,
    ) -> Result<BatchResult, BatchError> {
        if project.is_unresolved() {
            return Err(BatchError::UnresolvedProject);
        }
        if user_ids.is_empty() {
            return Err(BatchError::EmptyTargets);
        }

        let run = self.begin(BatchKind::Remove, user_ids.len())?;
        info!(project = %project, total = user_ids.len(), "Starting remove batch");
        run.publish(reporter);

        let mut result = match self.remote.remove_members(project, user_ids).await {
            Ok(result) => result,
            Err(e) => {
                warn!(project = %project, error = %e, "Remove batch failed");
                return Err(e.into());
            }
        };

        let accounted = result.accounted_ids();
        let unreported: Vec<UserId> = user_ids.difference(&accounted).copied().collect();
        if !unreported.is_empty() {
            warn!(
                project = %project,
                requested = user_ids.len(),
                unreported = unreported.len(),
                "Remote result left out requested ids"
            );
            result
                .failed
                .extend(unreported.into_iter().map(|user_id| FailedItem {
                    user_id,
                    reason: UNREPORTED_REASON.to_string(),
                }));
        }

        run.update(|s| s.absorb_bulk(&result));
        run.finish(reporter);
        info!(
            project = %project,
            succeeded = result.success_count(),
            failed = result.failed_count(),
            "Remove batch finished"
        );
        Ok(result)
    }

    fn begin(&self, kind: BatchKind, total: usize) -> Result<RunGuard<'_>, BatchError> {
        let mut state = self.lock();
        if state.is_running() {
            return Err(BatchError::AlreadyRunning);
        }
        *state = ProgressState::start(kind, total);
        Ok(RunGuard {
            runner: self,
            finished: false,
        })
    }

    fn lock(&self) -> MutexGuard<'_, ProgressState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Holds the runner in `Running` for one batch.
///
/// Dropped without `finish` (error return or abandoned future), it puts the
/// runner back to idle so the next batch is not locked out.
struct RunGuard<'a> {
    runner: &'a BatchRunner,
    finished: bool,
}

impl RunGuard<'_> {
    fn update(&self, f: impl FnOnce(&mut ProgressState)) {
        f(&mut *self.runner.lock());
    }

    /// Push a snapshot; the lock is released before the reporter runs.
    fn publish(&self, reporter: &dyn ProgressReporter) {
        let snapshot = self.runner.state();
        reporter.report(&snapshot);
    }

    fn finish(mut self, reporter: &dyn ProgressReporter) -> ProgressState {
        self.update(ProgressState::finish);
        self.finished = true;
        let snapshot = self.runner.state();
        reporter.report(&snapshot);
        snapshot
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            *self.runner.lock() = ProgressState::idle();
        }
    }
}
