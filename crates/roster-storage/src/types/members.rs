//! Cached member records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// Default row cap for member listings.
pub const DEFAULT_MEMBER_LIMIT: u32 = 500;

/// Cached copy of a person previously seen on the remote service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalMember {
    pub user_id: UserId,
    pub username: String,
    pub name: String,
    pub avatar_url: Option<String>,
    /// Project the member was last seen in (numeric remote id)
    pub project_id: Option<u64>,
    pub project_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl LocalMember {
    /// Label shown while a batch works on this member.
    pub fn label(&self) -> String {
        if !self.username.is_empty() {
            self.username.clone()
        } else if !self.name.is_empty() {
            self.name.clone()
        } else {
            self.user_id.to_string()
        }
    }
}

/// Parameters for inserting or refreshing a cached member.
///
/// Upserts are last-write-wins on every field; `updated_at` is set by the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpsertMemberParams {
    pub user_id: UserId,
    pub username: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub project_id: Option<u64>,
    pub project_name: Option<String>,
}

/// Filter for listing cached members.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberFilter {
    /// Substring matched against username or display name
    pub query: Option<String>,
    pub limit: u32,
}

impl Default for MemberFilter {
    fn default() -> Self {
        Self {
            query: None,
            limit: DEFAULT_MEMBER_LIMIT,
        }
    }
}

impl MemberFilter {
    pub fn matching(query: impl Into<String>) -> Self {
        let query = query.into();
        Self {
            query: (!query.trim().is_empty()).then(|| query.trim().to_string()),
            ..Self::default()
        }
    }
}
