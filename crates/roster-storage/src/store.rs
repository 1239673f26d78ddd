//! The MembershipStore trait that backends implement.

use crate::types::*;
use crate::StoreError;

/// The local membership cache that roster-batch and the CLI depend on.
///
/// Single writer at a time; every mutating call is atomic on its own.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait MembershipStore: Send + Sync {
    // ───────────────────────────────────── Members ────────────────────────────────────────

    /// Insert or update cached members by user id (last write wins).
    async fn upsert_members(&self, members: &[UpsertMemberParams]) -> Result<(), StoreError>;

    /// List cached members, newest first.
    async fn list_members(&self, filter: &MemberFilter) -> Result<Vec<LocalMember>, StoreError>;

    /// Delete cached members and their group memberships.
    /// Returns the number of member rows removed.
    async fn delete_members(&self, user_ids: &[UserId]) -> Result<u64, StoreError>;

    // ───────────────────────────────────── Groups ─────────────────────────────────────────

    /// Create an empty group. Names are trimmed and must be unique.
    async fn create_group(&self, name: &str) -> Result<LocalGroup, StoreError>;

    /// Get a group (with its member count) by ID.
    async fn get_group(&self, group_id: &GroupId) -> Result<LocalGroup, StoreError>;

    /// List all groups, newest first.
    async fn list_groups(&self) -> Result<Vec<LocalGroup>, StoreError>;

    /// Rename a group.
    async fn rename_group(&self, group_id: &GroupId, name: &str) -> Result<(), StoreError>;

    /// Delete a group and its membership rows (cached members are kept).
    async fn delete_group(&self, group_id: &GroupId) -> Result<(), StoreError>;

    // ───────────────────────────────────── Group Membership ───────────────────────────────

    /// Add cached members to a group. Already-present members are a no-op.
    async fn add_to_group(&self, group_id: &GroupId, user_ids: &[UserId])
        -> Result<(), StoreError>;

    /// Remove members from a group. Absent members are a no-op.
    async fn remove_from_group(
        &self,
        group_id: &GroupId,
        user_ids: &[UserId],
    ) -> Result<(), StoreError>;

    /// List a group's members ordered by username.
    async fn list_group_members(&self, group_id: &GroupId)
        -> Result<Vec<LocalMember>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    // Tiny compile-time smoke test for trait object usage.
    struct NoopStore;

    #[async_trait::async_trait]
    impl MembershipStore for NoopStore {
        async fn upsert_members(&self, _members: &[UpsertMemberParams]) -> Result<(), StoreError> {
            Ok(())
        }
        async fn list_members(&self, _filter: &MemberFilter) -> Result<Vec<LocalMember>, StoreError> {
            Ok(vec![])
        }
        async fn delete_members(&self, _user_ids: &[UserId]) -> Result<u64, StoreError> {
            Ok(0)
        }
        async fn create_group(&self, _name: &str) -> Result<LocalGroup, StoreError> {
            Err(StoreError::Backend("noop".into()))
        }
        async fn get_group(&self, _group_id: &GroupId) -> Result<LocalGroup, StoreError> {
            Err(StoreError::NotFound)
        }
        async fn list_groups(&self) -> Result<Vec<LocalGroup>, StoreError> {
            Ok(vec![])
        }
        async fn rename_group(&self, _group_id: &GroupId, _name: &str) -> Result<(), StoreError> {
            Err(StoreError::NotFound)
        }
        async fn delete_group(&self, _group_id: &GroupId) -> Result<(), StoreError> {
            Err(StoreError::NotFound)
        }
        async fn add_to_group(
            &self,
            _group_id: &GroupId,
            _user_ids: &[UserId],
        ) -> Result<(), StoreError> {
            Ok(())
        }
        async fn remove_from_group(
            &self,
            _group_id: &GroupId,
            _user_ids: &[UserId],
        ) -> Result<(), StoreError> {
            Ok(())
        }
        async fn list_group_members(
            &self,
            _group_id: &GroupId,
        ) -> Result<Vec<LocalMember>, StoreError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn usable_as_trait_object() {
        let store: Arc<dyn MembershipStore> = Arc::new(NoopStore);
        assert!(store.list_groups().await.unwrap().is_empty());
        assert!(matches!(
            store.get_group(&GroupId(1)).await,
            Err(StoreError::NotFound)
        ));
    }
}
