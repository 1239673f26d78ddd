//! Batch membership reconciliation for roster.
//!
//! [`BatchRunner`] applies one ADD or REMOVE operation to a set of users on a
//! remote project, classifying per-item failures ([`classify_add_failure`])
//! and pushing [`ProgressState`] snapshots to a [`ProgressReporter`]. Targets
//! come from an explicit selection or a local group ([`resolve_targets`]).

mod classify;
mod error;
mod progress;
mod runner;
mod targets;

pub use classify::{classify_add_failure, Classification, ALREADY_MEMBER_PHRASES};
pub use error::BatchError;
pub use progress::{BatchKind, BatchStatus, NoopReporter, ProgressReporter, ProgressState};
pub use runner::{BatchRunner, UNREPORTED_REASON};
pub use targets::{dedup_targets, resolve_targets, user_id_set, Target, TargetSelection};
