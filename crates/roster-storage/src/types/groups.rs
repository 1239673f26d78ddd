//! Local group types (user-defined named sets of cached members).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::GroupId;

/// Group record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalGroup {
    pub id: GroupId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub members_count: u64,
}
