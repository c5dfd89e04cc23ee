//! Integration tests for the context lifecycle service

use crate::integration::test_utils::{git_in, TestRepo};
use grove::context::{Context, ContextService, ContextStore, CreateRequest, StateLayout, Strategy};
use grove::lock::Lock;
use grove::GroveError;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

async fn service_for(test_repo: &TestRepo) -> ContextService {
    let repo = test_repo.repo().await;
    let store = ContextStore::at(&StateLayout::for_repo(&repo));
    ContextService::new(repo, store)
}

#[tokio::test]
async fn test_create_and_delete_worktree_context() {
    let test_repo = TestRepo::new();
    let service = service_for(&test_repo).await;
    let cancel = CancellationToken::new();

    let mut request = CreateRequest::new("feature");
    request.task = Some("write docs".to_string());
    request.agent = Some("claude".to_string());
    let context = service.create(&cancel, request).await.unwrap();

    assert_eq!(context.branch, "feature");
    assert_eq!(context.strategy, Strategy::Worktree);
    assert_eq!(context.task.as_deref(), Some("write docs"));
    assert!(context.path.exists());
    assert_eq!(service.store().get("feature").unwrap(), context);

    let status = service.status(&cancel, "feature").await.unwrap();
    assert!(status.is_clean());
    assert_eq!(status.branch, "feature");

    let removed = service.delete(&cancel, "feature", false).await.unwrap();
    assert_eq!(removed.name, "feature");
    assert!(!context.path.exists());
    assert!(service.store().list().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_clone_with_explicit_branch() {
    let test_repo = TestRepo::new();
    let service = service_for(&test_repo).await;
    let cancel = CancellationToken::new();

    let mut request = CreateRequest::new("experiment");
    request.branch = Some("exp/one".to_string());
    request.strategy = Strategy::Clone;
    let context = service.create(&cancel, request).await.unwrap();

    assert_eq!(context.strategy, Strategy::Clone);
    assert_eq!(git_in(&context.path, &["rev-parse", "--abbrev-ref", "HEAD"]), "exp/one");
    service.delete(&cancel, "experiment", false).await.unwrap();
}

#[tokio::test]
async fn test_default_strategy_applies_to_auto_requests() {
    let test_repo = TestRepo::new();
    let service = service_for(&test_repo)
        .await
        .with_default_strategy(Strategy::Clone);

    let context = service
        .create(&CancellationToken::new(), CreateRequest::new("auto"))
        .await
        .unwrap();
    assert_eq!(context.strategy, Strategy::Clone);
}

#[tokio::test]
async fn test_create_fails_without_commits() {
    let test_repo = TestRepo::empty();
    let service = service_for(&test_repo).await;

    let err = service
        .create(&CancellationToken::new(), CreateRequest::new("early"))
        .await
        .unwrap_err();
    assert!(matches!(err, GroveError::Validation(_)));
    assert!(service.store().list().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_rejects_duplicate_name_before_provisioning() {
    let test_repo = TestRepo::new();
    let service = service_for(&test_repo).await;
    let cancel = CancellationToken::new();
    service.create(&cancel, CreateRequest::new("dup")).await.unwrap();

    let mut again = CreateRequest::new("dup");
    again.branch = Some("other".to_string());
    let err = service.create(&cancel, again).await.unwrap_err();
    assert!(err.is_already_exists());
    assert!(!service.repo().branch_exists(&cancel, "other").await.unwrap());
}

#[tokio::test]
async fn test_failed_registration_removes_working_copy() {
    let test_repo = TestRepo::new();
    let service = service_for(&test_repo).await;
    let cancel = CancellationToken::new();
    let layout = StateLayout::for_repo(service.repo());

    // Occupy the path the new context would get, under a different name.
    let squatter = Context::new(
        "squatter",
        "squatter",
        layout.trees_dir().join("victim"),
        Strategy::Worktree,
    );
    service.store().add(&cancel, squatter).await.unwrap();

    let err = service
        .create(&cancel, CreateRequest::new("victim"))
        .await
        .unwrap_err();
    assert!(err.is_already_exists());
    assert!(!layout.trees_dir().join("victim").exists());
    assert_eq!(service.store().list().unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancel_while_waiting_for_lock_removes_working_copy() {
    let test_repo = TestRepo::new();
    let service = service_for(&test_repo).await;
    let layout = StateLayout::for_repo(service.repo());
    let holder = Lock::new(layout.lock_file());
    let held = holder.try_acquire().unwrap().expect("lock should be free");

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        trigger.cancel();
    });

    let err = service
        .create(&cancel, CreateRequest::new("stalled"))
        .await
        .unwrap_err();
    assert!(matches!(err, GroveError::LockTimeout(_)));
    assert!(!layout.trees_dir().join("stalled").exists());

    let fresh = CancellationToken::new();
    let worktrees = service.repo().worktree_list(&fresh).await.unwrap();
    assert_eq!(worktrees.len(), 1);
    held.release().unwrap();
    assert!(service.store().list().unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_dirty_context_requires_force() {
    let test_repo = TestRepo::new();
    let service = service_for(&test_repo).await;
    let cancel = CancellationToken::new();
    let context = service.create(&cancel, CreateRequest::new("messy")).await.unwrap();
    std::fs::write(context.path.join("notes.txt"), "todo").unwrap();

    let err = service.delete(&cancel, "messy", false).await.unwrap_err();
    assert!(matches!(err, GroveError::DirtyWorkingTree(_)));
    assert!(service.store().get("messy").is_ok());

    service.delete(&cancel, "messy", true).await.unwrap();
    assert!(service.store().get("messy").unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_rename_keeps_path_and_branch() {
    let test_repo = TestRepo::new();
    let service = service_for(&test_repo).await;
    let cancel = CancellationToken::new();
    let original = service.create(&cancel, CreateRequest::new("before")).await.unwrap();

    let renamed = service.rename(&cancel, "before", "after").await.unwrap();
    assert_eq!(renamed.name, "after");
    assert_eq!(renamed.path, original.path);
    assert_eq!(renamed.branch, "before");
    assert!(service.store().get("before").unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_operations_on_unknown_context_are_not_found() {
    let test_repo = TestRepo::new();
    let service = service_for(&test_repo).await;
    let cancel = CancellationToken::new();

    assert!(service.delete(&cancel, "ghost", true).await.unwrap_err().is_not_found());
    assert!(service.status(&cancel, "ghost").await.unwrap_err().is_not_found());
    assert!(service
        .rename(&cancel, "ghost", "spirit")
        .await
        .unwrap_err()
        .is_not_found());
}
