//! Resolution of batch targets from an explicit selection or a local group.

use roster_storage::{GroupId, LocalMember, MembershipStore, UserId};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

use crate::BatchError;

/// One user a batch acts on, with an optional display label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub user_id: UserId,
    pub label: Option<String>,
}

impl Target {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            label: None,
        }
    }

    pub fn labelled(user_id: UserId, label: impl Into<String>) -> Self {
        Self {
            user_id,
            label: Some(label.into()),
        }
    }

    /// Username if known, else the raw id.
    pub fn display_label(&self) -> String {
        match &self.label {
            Some(label) if !label.is_empty() => label.clone(),
            _ => self.user_id.to_string(),
        }
    }
}

impl From<UserId> for Target {
    fn from(user_id: UserId) -> Self {
        Self::new(user_id)
    }
}

impl From<&LocalMember> for Target {
    fn from(member: &LocalMember) -> Self {
        Self::labelled(member.user_id, member.label())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_label())
    }
}

/// Where the targets of a batch come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetSelection {
    /// Explicit ids picked from a listing.
    Users(Vec<Target>),
    /// Every cached member of a local group.
    Group(GroupId),
}

impl TargetSelection {
    pub fn users(ids: impl IntoIterator<Item = UserId>) -> Self {
        TargetSelection::Users(ids.into_iter().map(Target::new).collect())
    }
}

/// Resolve a selection into an ordered, duplicate-free target list.
///
/// An empty result is a precondition failure; store errors propagate as-is.
pub async fn resolve_targets(
    store: &dyn MembershipStore,
    selection: &TargetSelection,
) -> Result<Vec<Target>, BatchError> {
    let targets = match selection {
        TargetSelection::Users(targets) => dedup_targets(targets.iter().cloned()),
        TargetSelection::Group(group_id) => {
            let members = store.list_group_members(group_id).await?;
            debug!(group_id = %group_id, members = members.len(), "Resolved group members");
            dedup_targets(members.iter().map(Target::from))
        }
    };

    if targets.is_empty() {
        return Err(BatchError::EmptyTargets);
    }
    Ok(targets)
}

/// Drop repeated user ids, keeping the first occurrence and its order.
pub fn dedup_targets(targets: impl IntoIterator<Item = Target>) -> Vec<Target> {
    let mut seen = BTreeSet::new();
    targets
        .into_iter()
        .filter(|t| seen.insert(t.user_id))
        .collect()
}

pub fn user_id_set(targets: &[Target]) -> BTreeSet<UserId> {
    targets.iter().map(|t| t.user_id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_falls_back_to_id() {
        assert_eq!(Target::new(UserId(42)).display_label(), "42");
        assert_eq!(Target::labelled(UserId(42), "").display_label(), "42");
        assert_eq!(Target::labelled(UserId(42), "alice").to_string(), "alice");
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let targets = dedup_targets(vec![
            Target::labelled(UserId(3), "carol"),
            Target::new(UserId(1)),
            Target::labelled(UserId(3), "dup"),
            Target::new(UserId(2)),
        ]);
        let ids: Vec<_> = targets.iter().map(|t| t.user_id.0).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(targets[0].label.as_deref(), Some("carol"));
    }

    #[test]
    fn id_set_is_unordered() {
        let set = user_id_set(&[Target::new(UserId(5)), Target::new(UserId(1))]);
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![UserId(1), UserId(5)]);
    }
}
