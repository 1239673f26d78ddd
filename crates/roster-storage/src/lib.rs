//! Storage abstraction for roster's local membership cache.
//!
//! Backend crates (e.g., roster-store-sqlite) implement [`MembershipStore`] so the
//! batch engine and the CLI never depend on a specific database engine or schema.

mod store;
mod types;

use thiserror::Error;

pub use store::*;
pub use types::*;

/// Uniform error type for all storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("backend error: {0}")]
    Backend(String),
}
