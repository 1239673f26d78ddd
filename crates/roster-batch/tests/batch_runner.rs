//! Orchestrator behavior against mocked collaborators.

use roster_batch::{
    resolve_targets, BatchError, BatchKind, BatchRunner, BatchStatus, NoopReporter, ProgressState,
    Target, TargetSelection, UNREPORTED_REASON,
};
use roster_remote::{
    AccessLevel, BatchResult, ExpiresAt, FailedItem, MockRemoteDirectory, Page, ProjectMember,
    ProjectRef, ProjectSummary, RemoteDirectory, RemoteError,
};
use roster_storage::{GroupId, LocalMember, MockMembershipStore, UserId};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

const A: UserId = UserId(1);
const B: UserId = UserId(2);
const C: UserId = UserId(3);

fn project() -> ProjectRef {
    ProjectRef::Path("platform/api".into())
}

fn local_member(id: u64, username: &str) -> LocalMember {
    LocalMember {
        user_id: UserId(id),
        username: username.into(),
        name: username.to_uppercase(),
        avatar_url: None,
        project_id: Some(7),
        project_name: Some("platform/api".into()),
        updated_at: chrono::Utc::now(),
    }
}

/// A already a member, B added, C rejected with a structured reason.
fn abc_remote() -> MockRemoteDirectory {
    let mut remote = MockRemoteDirectory::new();
    remote
        .expect_add_member()
        .withf(|_, id, _, _| *id == A)
        .times(1)
        .returning(|_, _, _, _| Err(RemoteError::AlreadyMember));
    remote
        .expect_add_member()
        .withf(|_, id, _, _| *id == B)
        .times(1)
        .returning(|_, _, _, _| Ok(()));
    remote
        .expect_add_member()
        .withf(|_, id, _, _| *id == C)
        .times(1)
        .returning(|_, _, _, _| {
            Err(RemoteError::Api {
                status: 403,
                body: r#"{"message":"insufficient access"}"#.into(),
            })
        });
    remote
}

#[tokio::test]
async fn add_batch_reclassifies_and_records_failures() {
    let runner = BatchRunner::new(Arc::new(abc_remote()));
    let targets = vec![Target::new(A), Target::new(B), Target::new(C)];

    let result = runner
        .run_add_batch(&project(), &targets, AccessLevel::Developer, None, &NoopReporter)
        .await
        .unwrap();

    assert_eq!(result.success_user_ids, [A, B].into_iter().collect());
    assert_eq!(
        result.failed,
        vec![FailedItem {
            user_id: C,
            reason: "insufficient access".into()
        }]
    );

    let state = runner.state();
    assert_eq!(state.status(), BatchStatus::Done);
    assert_eq!(state.kind(), Some(BatchKind::Add));
    assert_eq!(state.processed(), 3);
    assert_eq!(state.success_count(), 2);
}

#[tokio::test]
async fn add_batch_reports_progress_one_item_at_a_time() {
    let runner = BatchRunner::new(Arc::new(abc_remote()));
    let targets = vec![
        Target::labelled(A, "alice"),
        Target::labelled(B, "bob"),
        Target::new(C),
    ];

    let seen = Mutex::new(Vec::<ProgressState>::new());
    let reporter = |s: &ProgressState| seen.lock().unwrap().push(s.clone());
    runner
        .run_add_batch(&project(), &targets, AccessLevel::Guest, None, &reporter)
        .await
        .unwrap();

    let seen = seen.into_inner().unwrap();
    let processed: Vec<_> = seen.iter().map(|s| s.processed()).collect();
    assert_eq!(processed, vec![0, 0, 1, 1, 2, 2, 3, 3]);

    let labels: Vec<_> = seen.iter().filter_map(|s| s.current_user_label()).collect();
    assert_eq!(labels, vec!["alice", "bob", "3"]);

    for s in &seen {
        assert_eq!(s.total(), 3);
        assert_eq!(s.processed(), s.success_count() + s.failed_so_far().len());
    }
    assert_eq!(seen.last().unwrap().status(), BatchStatus::Done);
    assert!(seen[..seen.len() - 1].iter().all(|s| s.is_running()));
}

#[tokio::test]
async fn add_batch_never_stops_early() {
    let mut remote = MockRemoteDirectory::new();
    remote.expect_add_member().times(4).returning(|_, _, _, _| {
        Err(RemoteError::Transport("network timeout".into()))
    });
    let runner = BatchRunner::new(Arc::new(remote));
    let targets: Vec<_> = (1..=4).map(|i| Target::new(UserId(i))).collect();

    let result = runner
        .run_add_batch(&project(), &targets, AccessLevel::Reporter, None, &NoopReporter)
        .await
        .unwrap();

    assert!(result.success_user_ids.is_empty());
    let failed: Vec<_> = result.failed.iter().map(|f| f.user_id.0).collect();
    assert_eq!(failed, vec![1, 2, 3, 4]);
    assert_eq!(result.failed[0].reason, "request failed: network timeout");
}

#[tokio::test]
async fn add_batch_passes_access_level_and_expiry_through() {
    let expiry: ExpiresAt = "2030-06-30".parse().unwrap();
    let mut remote = MockRemoteDirectory::new();
    remote
        .expect_add_member()
        .withf(move |p, id, level, exp| {
            *p == ProjectRef::Id(9)
                && *id == A
                && *level == AccessLevel::Maintainer
                && *exp == Some(expiry)
        })
        .times(1)
        .returning(|_, _, _, _| Ok(()));
    let runner = BatchRunner::new(Arc::new(remote));

    let result = runner
        .run_add_batch(
            &ProjectRef::Id(9),
            &[Target::new(A), Target::new(A)],
            AccessLevel::Maintainer,
            Some(expiry),
            &NoopReporter,
        )
        .await
        .unwrap();
    assert!(result.is_complete_success());
    assert_eq!(runner.state().total(), 1);
}

#[tokio::test]
async fn add_batch_partitions_every_input() {
    let mut remote = MockRemoteDirectory::new();
    remote
        .expect_add_member()
        .returning(|_, id, _, _| match id.0 % 3 {
            0 => Ok(()),
            1 => Err(RemoteError::Api {
                status: 409,
                body: "User is already a member".into(),
            }),
            _ => Err(RemoteError::Api {
                status: 422,
                body: r#"{"message":{"expires_at":["must be in the future"]}}"#.into(),
            }),
        });
    let runner = BatchRunner::new(Arc::new(remote));
    let targets: Vec<_> = (1..=10).map(|i| Target::new(UserId(i))).collect();

    let result = runner
        .run_add_batch(&project(), &targets, AccessLevel::Developer, None, &NoopReporter)
        .await
        .unwrap();

    let input: BTreeSet<_> = targets.iter().map(|t| t.user_id).collect();
    let failed: BTreeSet<_> = result.failed.iter().map(|f| f.user_id).collect();
    assert!(result.success_user_ids.is_disjoint(&failed));
    assert_eq!(result.accounted_ids(), input);
    assert!(result
        .failed
        .iter()
        .all(|f| f.reason == "must be in the future"));
}

#[tokio::test]
async fn preconditions_fail_before_any_remote_call() {
    let mut remote = MockRemoteDirectory::new();
    remote.expect_add_member().times(0);
    remote.expect_remove_members().times(0);
    let runner = BatchRunner::new(Arc::new(remote));

    let err = runner
        .run_add_batch(&project(), &[], AccessLevel::Developer, None, &NoopReporter)
        .await
        .unwrap_err();
    assert!(matches!(err, BatchError::EmptyTargets));

    let err = runner
        .run_add_batch(
            &ProjectRef::Path("  ".into()),
            &[Target::new(A)],
            AccessLevel::Developer,
            None,
            &NoopReporter,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BatchError::UnresolvedProject));

    let err = runner
        .run_remove_batch(&project(), &BTreeSet::new(), &NoopReporter)
        .await
        .unwrap_err();
    assert!(matches!(err, BatchError::EmptyTargets));

    assert_eq!(runner.state().status(), BatchStatus::Idle);
}

#[tokio::test]
async fn empty_group_fails_before_any_remote_call() {
    let mut store = MockMembershipStore::new();
    store
        .expect_list_group_members()
        .withf(|group_id| group_id.0 == 7)
        .times(1)
        .returning(|_| Ok(vec![]));

    let mut remote = MockRemoteDirectory::new();
    remote.expect_add_member().times(0);
    let runner = BatchRunner::new(Arc::new(remote));

    let err = resolve_targets(&store, &TargetSelection::Group(GroupId(7)))
        .await
        .unwrap_err();
    assert!(matches!(err, BatchError::EmptyTargets));
    assert_eq!(runner.state().status(), BatchStatus::Idle);
}

#[tokio::test]
async fn group_targets_carry_usernames() {
    let mut store = MockMembershipStore::new();
    store
        .expect_list_group_members()
        .returning(|_| Ok(vec![local_member(2, "bob"), local_member(1, "alice")]));

    let targets = resolve_targets(&store, &TargetSelection::Group(GroupId(1)))
        .await
        .unwrap();
    assert_eq!(
        targets,
        vec![Target::labelled(B, "bob"), Target::labelled(A, "alice")]
    );
}

#[tokio::test]
async fn store_errors_abort_resolution() {
    let mut store = MockMembershipStore::new();
    store
        .expect_list_group_members()
        .returning(|_| Err(roster_storage::StoreError::Backend("database is locked".into())));

    let err = resolve_targets(&store, &TargetSelection::Group(GroupId(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, BatchError::Store(_)));
}

#[tokio::test]
async fn remove_batch_transport_error_fails_whole_operation() {
    let mut remote = MockRemoteDirectory::new();
    remote
        .expect_remove_members()
        .times(1)
        .returning(|_, _| Err(RemoteError::Transport("network unreachable".into())));
    let runner = BatchRunner::new(Arc::new(remote));
    let ids: BTreeSet<_> = (1..=5).map(UserId).collect();

    let err = runner
        .run_remove_batch(&project(), &ids, &NoopReporter)
        .await
        .unwrap_err();
    match err {
        BatchError::Remote(e) => assert!(e.is_transport()),
        other => panic!("expected remote error, got {:?}", other),
    }
    assert_eq!(runner.state().status(), BatchStatus::Idle);
}

#[tokio::test]
async fn remove_batch_trusts_remote_partition() {
    let mut remote = MockRemoteDirectory::new();
    remote
        .expect_remove_members()
        .times(1)
        .returning(|_, ids| {
            let failed = [UserId(2), UserId(4)];
            Ok(BatchResult {
                success_user_ids: ids.iter().copied().filter(|id| !failed.contains(id)).collect(),
                failed: failed
                    .iter()
                    .map(|&user_id| FailedItem {
                        user_id,
                        reason: "API error 403: 403 Forbidden".into(),
                    })
                    .collect(),
            })
        });
    let runner = BatchRunner::new(Arc::new(remote));
    let ids: BTreeSet<_> = (1..=5).map(UserId).collect();

    let seen = Mutex::new(Vec::<ProgressState>::new());
    let reporter = |s: &ProgressState| seen.lock().unwrap().push(s.clone());
    let result = runner
        .run_remove_batch(&project(), &ids, &reporter)
        .await
        .unwrap();

    assert_eq!(result.success_count(), 3);
    assert_eq!(result.failed_count(), 2);
    assert_eq!(result.failed[0].reason, "API error 403: 403 Forbidden");
    assert_eq!(result.accounted_ids(), ids);

    let processed: Vec<_> = seen
        .into_inner()
        .unwrap()
        .iter()
        .map(|s| (s.processed(), s.status()))
        .collect();
    assert_eq!(
        processed,
        vec![(0, BatchStatus::Running), (5, BatchStatus::Done)]
    );
    assert_eq!(runner.state().kind(), Some(BatchKind::Remove));
}

#[tokio::test]
async fn remove_batch_fails_ids_the_remote_left_out() {
    let mut remote = MockRemoteDirectory::new();
    remote.expect_remove_members().times(1).returning(|_, _| {
        Ok(BatchResult {
            success_user_ids: [UserId(1)].into_iter().collect(),
            failed: vec![],
        })
    });
    let runner = BatchRunner::new(Arc::new(remote));
    let ids: BTreeSet<_> = (1..=3).map(UserId).collect();

    let result = runner
        .run_remove_batch(&project(), &ids, &NoopReporter)
        .await
        .unwrap();

    assert_eq!(result.success_user_ids, [UserId(1)].into_iter().collect());
    assert_eq!(
        result.failed,
        vec![
            FailedItem {
                user_id: UserId(2),
                reason: UNREPORTED_REASON.into()
            },
            FailedItem {
                user_id: UserId(3),
                reason: UNREPORTED_REASON.into()
            },
        ]
    );
    assert_eq!(result.accounted_ids(), ids);

    let state = runner.state();
    assert_eq!(state.status(), BatchStatus::Done);
    assert_eq!(state.processed(), state.total());
    assert_eq!(state.failed_so_far().len(), 2);
}

#[tokio::test]
async fn reset_returns_to_idle_after_done() {
    let mut remote = MockRemoteDirectory::new();
    remote.expect_add_member().returning(|_, _, _, _| Ok(()));
    let runner = BatchRunner::new(Arc::new(remote));

    runner
        .run_add_batch(&project(), &[Target::new(A)], AccessLevel::Guest, None, &NoopReporter)
        .await
        .unwrap();
    assert_eq!(runner.state().status(), BatchStatus::Done);

    runner.reset().unwrap();
    assert_eq!(runner.state(), ProgressState::idle());
}

/// Remote whose add call parks until released.
struct GatedRemote {
    entered: Notify,
    release: Notify,
}

#[async_trait::async_trait]
impl RemoteDirectory for GatedRemote {
    async fn search_projects(
        &self,
        _keyword: &str,
        _page: u32,
        _per_page: u32,
    ) -> Result<Page<ProjectSummary>, RemoteError> {
        Ok(Page::empty())
    }

    async fn list_members(
        &self,
        _project: &ProjectRef,
        _page: u32,
        _per_page: u32,
    ) -> Result<Page<ProjectMember>, RemoteError> {
        Ok(Page::empty())
    }

    async fn add_member(
        &self,
        _project: &ProjectRef,
        _user_id: UserId,
        _access_level: AccessLevel,
        _expires_at: Option<ExpiresAt>,
    ) -> Result<(), RemoteError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(())
    }

    async fn remove_members(
        &self,
        _project: &ProjectRef,
        _user_ids: &BTreeSet<UserId>,
    ) -> Result<BatchResult, RemoteError> {
        Ok(BatchResult::default())
    }
}

#[tokio::test]
async fn second_batch_is_rejected_while_running() {
    let remote = Arc::new(GatedRemote {
        entered: Notify::new(),
        release: Notify::new(),
    });
    let runner = Arc::new(BatchRunner::new(remote.clone()));

    let first = {
        let runner = runner.clone();
        tokio::spawn(async move {
            runner
                .run_add_batch(
                    &ProjectRef::Id(1),
                    &[Target::new(A)],
                    AccessLevel::Developer,
                    None,
                    &NoopReporter,
                )
                .await
        })
    };

    remote.entered.notified().await;
    assert!(runner.state().is_running());

    let ids: BTreeSet<_> = [B].into_iter().collect();
    let err = runner
        .run_remove_batch(&ProjectRef::Id(1), &ids, &NoopReporter)
        .await
        .unwrap_err();
    assert!(matches!(err, BatchError::AlreadyRunning));
    assert!(matches!(runner.reset(), Err(BatchError::AlreadyRunning)));

    remote.release.notify_one();
    let result = first.await.unwrap().unwrap();
    assert!(result.is_complete_success());
    assert_eq!(runner.state().status(), BatchStatus::Done);
}
