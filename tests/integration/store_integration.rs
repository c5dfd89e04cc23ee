//! Cross-handle concurrency tests for the context store

use grove::context::{Context, ContextStore, StateLayout, Strategy};
use grove::lock::Lock;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_from_separate_handles_are_all_kept() {
    let temp = TempDir::new().unwrap();
    let layout = StateLayout::new(temp.path().join("grove"));

    let mut handles = Vec::new();
    for i in 0..16 {
        let layout = layout.clone();
        handles.push(tokio::spawn(async move {
            // Each handle has its own in-process gate, so only the file lock serializes them.
            let store = ContextStore::new(
                layout.state_file(),
                Lock::new(layout.lock_file()).with_poll_interval(Duration::from_millis(5)),
            );
            let name = format!("ctx-{:02}", i);
            let context = Context::new(
                &name,
                &name,
                layout.trees_dir().join(&name),
                Strategy::Worktree,
            );
            store.add(&CancellationToken::new(), context).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let store = ContextStore::at(&layout);
    let mut names: Vec<String> = store.list().unwrap().into_iter().map(|c| c.name).collect();
    names.sort();
    let expected: Vec<String> = (0..16).map(|i| format!("ctx-{:02}", i)).collect();
    assert_eq!(names, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_adds_admit_exactly_one() {
    let temp = TempDir::new().unwrap();
    let layout = StateLayout::new(temp.path().join("grove"));

    let mut handles = Vec::new();
    for i in 0..8 {
        let layout = layout.clone();
        handles.push(tokio::spawn(async move {
            let store = ContextStore::at(&layout);
            let context = Context::new(
                "shared",
                "shared",
                layout.trees_dir().join(format!("copy-{}", i)),
                Strategy::Clone,
            );
            store.add(&CancellationToken::new(), context).await
        }));
    }

    let mut admitted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => admitted += 1,
            Err(err) => assert!(err.is_already_exists(), "unexpected error: {}", err),
        }
    }
    assert_eq!(admitted, 1);
    assert_eq!(ContextStore::at(&layout).list().unwrap().len(), 1);
}
