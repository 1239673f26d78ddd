//! Remote directory types shared by the client contract and its callers.

use chrono::NaiveDate;
use roster_storage::UserId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::RemoteError;

/// Target project: numeric remote id or namespaced path (`group/sub/project`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProjectRef {
    Id(u64),
    Path(String),
}

impl ProjectRef {
    /// True when the reference cannot address any project.
    pub fn is_unresolved(&self) -> bool {
        match self {
            ProjectRef::Id(id) => *id == 0,
            ProjectRef::Path(path) => path.trim().is_empty(),
        }
    }

    /// Path segment form: ids verbatim, paths URL-encoded (`a/b` -> `a%2Fb`).
    pub fn encoded(&self) -> String {
        match self {
            ProjectRef::Id(id) => id.to_string(),
            ProjectRef::Path(path) => urlencoding::encode(path.trim()).into_owned(),
        }
    }
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectRef::Id(id) => write!(f, "{}", id),
            ProjectRef::Path(path) => write!(f, "{}", path),
        }
    }
}

impl FromStr for ProjectRef {
    type Err = RemoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(RemoteError::InvalidProject("project is empty".into()));
        }
        if s.chars().all(|c| c.is_ascii_digit()) {
            let id = s
                .parse()
                .map_err(|_| RemoteError::InvalidProject(format!("project id out of range: {}", s)))?;
            return Ok(ProjectRef::Id(id));
        }
        Ok(ProjectRef::Path(s.to_string()))
    }
}

/// Membership privilege rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum AccessLevel {
    Guest,
    Reporter,
    Developer,
    Maintainer,
    Owner,
}

impl AccessLevel {
    /// Levels an operator may grant through a batch add.
    pub const GRANTABLE: [AccessLevel; 4] = [
        AccessLevel::Guest,
        AccessLevel::Reporter,
        AccessLevel::Developer,
        AccessLevel::Maintainer,
    ];

    pub fn value(self) -> i64 {
        match self {
            AccessLevel::Guest => 10,
            AccessLevel::Reporter => 20,
            AccessLevel::Developer => 30,
            AccessLevel::Maintainer => 40,
            AccessLevel::Owner => 50,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AccessLevel::Guest => "Guest",
            AccessLevel::Reporter => "Reporter",
            AccessLevel::Developer => "Developer",
            AccessLevel::Maintainer => "Maintainer",
            AccessLevel::Owner => "Owner",
        }
    }

    /// Display label for a raw remote value, e.g. `Developer (30)`.
    pub fn label(value: i64) -> String {
        match AccessLevel::try_from(value) {
            Ok(level) => level.to_string(),
            Err(_) => value.to_string(),
        }
    }
}

impl TryFrom<i64> for AccessLevel {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            10 => Ok(AccessLevel::Guest),
            20 => Ok(AccessLevel::Reporter),
            30 => Ok(AccessLevel::Developer),
            40 => Ok(AccessLevel::Maintainer),
            50 => Ok(AccessLevel::Owner),
            other => Err(format!("unknown access level: {}", other)),
        }
    }
}

impl From<AccessLevel> for i64 {
    fn from(level: AccessLevel) -> Self {
        level.value()
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.value())
    }
}

impl FromStr for AccessLevel {
    type Err = String;

    /// Accepts the rank (`30`) or the name (`developer`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(value) = s.parse::<i64>() {
            return AccessLevel::try_from(value);
        }
        match s.to_ascii_lowercase().as_str() {
            "guest" => Ok(AccessLevel::Guest),
            "reporter" => Ok(AccessLevel::Reporter),
            "developer" => Ok(AccessLevel::Developer),
            "maintainer" => Ok(AccessLevel::Maintainer),
            "owner" => Ok(AccessLevel::Owner),
            _ => Err(format!(
                "unknown access level '{}' (expected guest, reporter, developer, maintainer or 10/20/30/40)",
                s
            )),
        }
    }
}

/// Membership expiry date, sent as `YYYY-MM-DD`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpiresAt(pub NaiveDate);

impl ExpiresAt {
    /// Blank input means "no expiry".
    pub fn parse_optional(s: &str) -> Result<Option<Self>, String> {
        if s.trim().is_empty() {
            return Ok(None);
        }
        s.parse().map(Some)
    }
}

impl fmt::Display for ExpiresAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for ExpiresAt {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(ExpiresAt)
            .map_err(|_| format!("invalid date '{}' (expected YYYY-MM-DD)", s.trim()))
    }
}

/// Project search hit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: u64,
    pub name: String,
    pub namespace: String,
    pub path_with_namespace: String,
    pub description: Option<String>,
    pub last_activity_at: String,
}

/// Member row of a remote project listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMember {
    pub id: UserId,
    pub username: String,
    pub name: String,
    pub avatar_url: Option<String>,
    /// Raw rank; remote listings may carry levels outside [`AccessLevel`]
    pub access_level: i64,
    pub created_at: Option<String>,
    pub expires_at: Option<String>,
}

/// One page of a paginated listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total across all pages
    pub total: u64,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }

    /// Number of pages of `per_page` items (at least 1).
    pub fn page_count(&self, per_page: u32) -> u64 {
        let per_page = u64::from(per_page.max(1));
        self.total.div_ceil(per_page).max(1)
    }
}

/// A user whose membership change did not take effect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    pub user_id: UserId,
    pub reason: String,
}

/// Per-user partition of a batch membership change.
///
/// `success_user_ids` and the ids in `failed` are disjoint; `failed` keeps
/// processing order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub success_user_ids: BTreeSet<UserId>,
    pub failed: Vec<FailedItem>,
}

impl BatchResult {
    pub fn success_count(&self) -> usize {
        self.success_user_ids.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Every user id this result accounts for.
    pub fn accounted_ids(&self) -> BTreeSet<UserId> {
        self.success_user_ids
            .iter()
            .copied()
            .chain(self.failed.iter().map(|f| f.user_id))
            .collect()
    }
}
