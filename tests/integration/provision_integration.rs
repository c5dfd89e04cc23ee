//! Integration tests for the worktree and clone provisioners

use crate::integration::test_utils::{git_in, TestRepo};
use grove::context::{provisioner_for, CreateOptions, Strategy};
use grove::GroveError;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_worktree_creates_new_branch_from_base() {
    let test_repo = TestRepo::new();
    test_repo.git(&["branch", "release"]);
    test_repo.commit_file("main-only.txt", "x", "main moves on");
    let repo = test_repo.repo().await;
    let cancel = CancellationToken::new();

    let provisioner = provisioner_for(Strategy::Auto, &repo);
    assert_eq!(provisioner.strategy(), Strategy::Worktree);

    let path = provisioner
        .create(
            &cancel,
            &CreateOptions {
                name: "feat/login",
                branch: "feat/login",
                base_branch: Some("release"),
                repo: &repo,
            },
        )
        .await
        .unwrap();

    assert_eq!(path, test_repo.state_dir().join("trees").join("feat__login"));
    assert_eq!(git_in(&path, &["rev-parse", "--abbrev-ref", "HEAD"]), "feat/login");
    assert!(!path.join("main-only.txt").exists());

    provisioner.destroy(&cancel, &path, false).await.unwrap();
    assert!(!path.exists());
    assert!(repo.branch_exists(&cancel, "feat/login").await.unwrap());
}

#[tokio::test]
async fn test_worktree_checks_out_existing_branch() {
    let test_repo = TestRepo::new();
    test_repo.git(&["branch", "existing"]);
    let repo = test_repo.repo().await;
    let cancel = CancellationToken::new();

    let provisioner = provisioner_for(Strategy::Worktree, &repo);
    let path = provisioner
        .create(
            &cancel,
            &CreateOptions {
                name: "ctx",
                branch: "existing",
                base_branch: None,
                repo: &repo,
            },
        )
        .await
        .unwrap();
    assert_eq!(git_in(&path, &["rev-parse", "--abbrev-ref", "HEAD"]), "existing");
}

#[tokio::test]
async fn test_worktree_bad_base_leaves_nothing_behind() {
    let test_repo = TestRepo::new();
    let repo = test_repo.repo().await;
    let cancel = CancellationToken::new();

    let provisioner = provisioner_for(Strategy::Worktree, &repo);
    let err = provisioner
        .create(
            &cancel,
            &CreateOptions {
                name: "broken",
                branch: "broken",
                base_branch: Some("does-not-exist"),
                repo: &repo,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GroveError::Subprocess { .. }));
    assert!(!test_repo.state_dir().join("trees").join("broken").exists());
}

#[tokio::test]
async fn test_worktree_dirty_destroy_requires_force() {
    let test_repo = TestRepo::new();
    let repo = test_repo.repo().await;
    let cancel = CancellationToken::new();
    let provisioner = provisioner_for(Strategy::Worktree, &repo);
    let path = provisioner
        .create(
            &cancel,
            &CreateOptions {
                name: "dirty",
                branch: "dirty",
                base_branch: None,
                repo: &repo,
            },
        )
        .await
        .unwrap();
    std::fs::write(path.join("scratch.txt"), "wip").unwrap();

    let err = provisioner.destroy(&cancel, &path, false).await.unwrap_err();
    assert!(matches!(err, GroveError::DirtyWorkingTree(_)));
    assert!(path.exists());

    provisioner.destroy(&cancel, &path, true).await.unwrap();
    assert!(!path.exists());
}

#[tokio::test]
async fn test_worktree_force_destroy_of_missing_directory_succeeds() {
    let test_repo = TestRepo::new();
    let repo = test_repo.repo().await;
    let cancel = CancellationToken::new();
    let provisioner = provisioner_for(Strategy::Worktree, &repo);
    let path = provisioner
        .create(
            &cancel,
            &CreateOptions {
                name: "gone",
                branch: "gone",
                base_branch: None,
                repo: &repo,
            },
        )
        .await
        .unwrap();
    std::fs::remove_dir_all(&path).unwrap();

    provisioner.destroy(&cancel, &path, true).await.unwrap();
    let worktrees = repo.worktree_list(&cancel).await.unwrap();
    assert_eq!(worktrees.len(), 1, "stale worktree entry should be pruned");
}

#[tokio::test]
async fn test_worktree_destroy_after_cancellation() {
    let test_repo = TestRepo::new();
    let repo = test_repo.repo().await;
    let provisioner = provisioner_for(Strategy::Worktree, &repo);
    let path = provisioner
        .create(
            &CancellationToken::new(),
            &CreateOptions {
                name: "late",
                branch: "late",
                base_branch: None,
                repo: &repo,
            },
        )
        .await
        .unwrap();

    let cancelled = CancellationToken::new();
    cancelled.cancel();

    let err = provisioner.destroy(&cancelled, &path, false).await.unwrap_err();
    assert!(matches!(err, GroveError::Cancelled));
    assert!(path.exists(), "an unforced destroy stops when cancelled");

    provisioner.destroy(&cancelled, &path, true).await.unwrap();
    assert!(!path.exists());
    let worktrees = repo.worktree_list(&CancellationToken::new()).await.unwrap();
    assert_eq!(worktrees.len(), 1);
}

#[tokio::test]
async fn test_clone_create_and_destroy() {
    let test_repo = TestRepo::new();
    let repo = test_repo.repo().await;
    let cancel = CancellationToken::new();

    let provisioner = provisioner_for(Strategy::Clone, &repo);
    assert_eq!(provisioner.strategy(), Strategy::Clone);
    let path = provisioner
        .create(
            &cancel,
            &CreateOptions {
                name: "cloned",
                branch: "topic",
                base_branch: None,
                repo: &repo,
            },
        )
        .await
        .unwrap();

    assert_eq!(path, test_repo.state_dir().join("clones").join("cloned"));
    assert_eq!(git_in(&path, &["rev-parse", "--abbrev-ref", "HEAD"]), "topic");
    assert!(path.join("README.md").exists());

    provisioner.destroy(&cancel, &path, false).await.unwrap();
    assert!(!path.exists());
}

#[tokio::test]
async fn test_clone_tracks_existing_source_branch() {
    let test_repo = TestRepo::new();
    test_repo.git(&["checkout", "-q", "-b", "shared"]);
    test_repo.commit_file("shared.txt", "s", "shared work");
    test_repo.git(&["checkout", "-q", "main"]);
    let repo = test_repo.repo().await;
    let cancel = CancellationToken::new();

    let provisioner = provisioner_for(Strategy::Clone, &repo);
    let path = provisioner
        .create(
            &cancel,
            &CreateOptions {
                name: "shared",
                branch: "shared",
                base_branch: None,
                repo: &repo,
            },
        )
        .await
        .unwrap();
    assert!(path.join("shared.txt").exists());
}

#[tokio::test]
async fn test_clone_dirty_destroy_requires_force() {
    let test_repo = TestRepo::new();
    let repo = test_repo.repo().await;
    let cancel = CancellationToken::new();
    let provisioner = provisioner_for(Strategy::Clone, &repo);
    let path = provisioner
        .create(
            &cancel,
            &CreateOptions {
                name: "wip",
                branch: "wip",
                base_branch: None,
                repo: &repo,
            },
        )
        .await
        .unwrap();
    std::fs::write(path.join("untracked.txt"), "wip").unwrap();

    let err = provisioner.destroy(&cancel, &path, false).await.unwrap_err();
    assert!(matches!(err, GroveError::DirtyWorkingTree(_)));
    assert!(path.exists());

    provisioner.destroy(&cancel, &path, true).await.unwrap();
    assert!(!path.exists());
}

#[tokio::test]
async fn test_clone_bad_base_removes_partial_clone() {
    let test_repo = TestRepo::new();
    let repo = test_repo.repo().await;
    let cancel = CancellationToken::new();
    let provisioner = provisioner_for(Strategy::Clone, &repo);

    let err = provisioner
        .create(
            &cancel,
            &CreateOptions {
                name: "partial",
                branch: "partial",
                base_branch: Some("does-not-exist"),
                repo: &repo,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GroveError::Subprocess { .. }));
    assert!(!test_repo.state_dir().join("clones").join("partial").exists());
}

#[tokio::test]
async fn test_create_refuses_existing_directory() {
    let test_repo = TestRepo::new();
    let repo = test_repo.repo().await;
    let occupied = test_repo.state_dir().join("trees").join("taken");
    std::fs::create_dir_all(&occupied).unwrap();
    std::fs::write(occupied.join("keep.txt"), "mine").unwrap();

    let err = provisioner_for(Strategy::Worktree, &repo)
        .create(
            &CancellationToken::new(),
            &CreateOptions {
                name: "taken",
                branch: "taken",
                base_branch: None,
                repo: &repo,
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_already_exists());
    assert!(occupied.join("keep.txt").exists());
}
