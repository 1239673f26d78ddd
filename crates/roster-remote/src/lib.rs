//! Remote directory abstraction for roster.
//!
//! [`RemoteDirectory`] is the capability set the batch engine consumes: project
//! search, paginated member listing, single-member add and bulk removal.
//! [`GitLabClient`] implements it over the GitLab REST v4 API.

mod error;
mod gitlab;
mod types;

use async_trait::async_trait;
use roster_storage::UserId;
use std::collections::BTreeSet;

pub use error::RemoteError;
pub use gitlab::{GitLabClient, GitLabConfig, DEFAULT_TIMEOUT_SECS, MAX_PER_PAGE};
pub use types::*;

/// Membership operations on the remote project-hosting service.
///
/// No retries happen at this layer; transport timeouts belong to the implementation.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait]
pub trait RemoteDirectory: Send + Sync {
    /// Search projects by keyword (1-based `page`).
    async fn search_projects(
        &self,
        keyword: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Page<ProjectSummary>, RemoteError>;

    /// List one page of a project's members, including inherited ones.
    async fn list_members(
        &self,
        project: &ProjectRef,
        page: u32,
        per_page: u32,
    ) -> Result<Page<ProjectMember>, RemoteError>;

    /// Add one user to a project.
    async fn add_member(
        &self,
        project: &ProjectRef,
        user_id: UserId,
        access_level: AccessLevel,
        expires_at: Option<ExpiresAt>,
    ) -> Result<(), RemoteError>;

    /// Remove many users from a project.
    ///
    /// The returned result partitions `user_ids` per user. `Err` means the call
    /// as a whole could not be completed.
    async fn remove_members(
        &self,
        project: &ProjectRef,
        user_ids: &BTreeSet<UserId>,
    ) -> Result<BatchResult, RemoteError>;
}
