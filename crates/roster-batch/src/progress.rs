//! Progress model pushed to the presentation layer while a batch runs.

use roster_remote::{BatchResult, FailedItem};
use roster_storage::UserId;
use serde::Serialize;

/// Membership operation a batch applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum BatchKind {
    Add,
    Remove,
}

impl std::fmt::Display for BatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchKind::Add => write!(f, "add"),
            BatchKind::Remove => write!(f, "remove"),
        }
    }
}

/// Lifecycle of one batch run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum BatchStatus {
    Idle,
    Running,
    Done,
}

/// Observable state of a batch.
///
/// `processed == success_count + failed_so_far.len()` holds at every
/// observation point, and `processed` never exceeds `total`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProgressState {
    kind: Option<BatchKind>,
    status: BatchStatus,
    total: usize,
    processed: usize,
    success_count: usize,
    failed_so_far: Vec<FailedItem>,
    current_user_label: Option<String>,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::idle()
    }
}

impl ProgressState {
    pub fn idle() -> Self {
        Self {
            kind: None,
            status: BatchStatus::Idle,
            total: 0,
            processed: 0,
            success_count: 0,
            failed_so_far: Vec::new(),
            current_user_label: None,
        }
    }

    /// Fresh running state; `total` is fixed from here on.
    pub fn start(kind: BatchKind, total: usize) -> Self {
        Self {
            kind: Some(kind),
            status: BatchStatus::Running,
            total,
            ..Self::idle()
        }
    }

    pub fn kind(&self) -> Option<BatchKind> {
        self.kind
    }

    pub fn status(&self) -> BatchStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == BatchStatus::Running
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn success_count(&self) -> usize {
        self.success_count
    }

    pub fn failed_so_far(&self) -> &[FailedItem] {
        &self.failed_so_far
    }

    pub fn current_user_label(&self) -> Option<&str> {
        self.current_user_label.as_deref()
    }

    pub fn remaining(&self) -> usize {
        self.total - self.processed
    }

    /// Completion in percent (0 for an empty batch).
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.processed as f64 / self.total as f64) * 100.0
        }
    }

    pub(crate) fn begin_item(&mut self, label: String) {
        self.current_user_label = Some(label);
    }

    pub(crate) fn record_success(&mut self) {
        debug_assert!(self.processed < self.total);
        self.success_count += 1;
        self.finish_item();
    }

    pub(crate) fn record_failure(&mut self, user_id: UserId, reason: String) {
        debug_assert!(self.processed < self.total);
        self.failed_so_far.push(FailedItem { user_id, reason });
        self.finish_item();
    }

    fn finish_item(&mut self) {
        self.processed += 1;
        self.current_user_label = None;
    }

    /// Absorb a bulk result in one step.
    ///
    /// The remote partition is trusted as-is, so `processed` becomes its size
    /// (normally `total`) capped at `total`.
    pub(crate) fn absorb_bulk(&mut self, result: &BatchResult) {
        self.success_count = result.success_count().min(self.total);
        self.failed_so_far = result
            .failed
            .iter()
            .take(self.total - self.success_count)
            .cloned()
            .collect();
        self.processed = self.success_count + self.failed_so_far.len();
        self.current_user_label = None;
    }

    pub(crate) fn finish(&mut self) {
        self.status = BatchStatus::Done;
        self.current_user_label = None;
    }
}

/// Sink for progress snapshots.
///
/// Called synchronously on the batch's own execution path, so implementations
/// must return promptly.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, state: &ProgressState);
}

impl<F> ProgressReporter for F
where
    F: Fn(&ProgressState) + Send + Sync,
{
    fn report(&self, state: &ProgressState) {
        self(state)
    }
}

/// Reporter that drops every snapshot.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _state: &ProgressState) {}
}
