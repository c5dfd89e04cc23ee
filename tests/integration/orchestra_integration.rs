//! Integration tests for plan execution

use crate::integration::test_utils::{RecordingSpawner, StaticAgents, TestRepo};
use grove::context::{Context, ContextStore, StateLayout, Strategy};
use grove::lock::Lock;
use grove::orchestra::{OrchestraRunner, Plan, TaskDef, TaskFailure};
use grove::GroveError;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct Harness {
    test_repo: TestRepo,
    store: ContextStore,
    spawner: Arc<RecordingSpawner>,
    runner: OrchestraRunner,
}

async fn harness(spawner: RecordingSpawner) -> Harness {
    let test_repo = TestRepo::new();
    let repo = test_repo.repo().await;
    let store = ContextStore::at(&StateLayout::for_repo(&repo));
    let spawner = Arc::new(spawner);
    let runner = OrchestraRunner::new(
        repo,
        store.clone(),
        Arc::new(StaticAgents),
        spawner.clone(),
    );
    Harness {
        test_repo,
        store,
        spawner,
        runner,
    }
}

fn task(name: &str) -> TaskDef {
    let mut task = TaskDef::new(name, "echo");
    task.prompt = format!("work on {}", name);
    task
}

#[tokio::test]
async fn test_independent_tasks_run_concurrently() {
    let h = harness(RecordingSpawner::new(Duration::from_millis(200))).await;
    let plan = Plan::new(vec![task("a"), task("b"), task("c")]);

    let outcomes = h.runner.run(&CancellationToken::new(), &plan).await.unwrap();
    assert!(outcomes.iter().all(|o| o.is_success()));

    let calls = h.spawner.calls();
    assert_eq!(calls.len(), 3);
    let latest_start = calls.iter().map(|c| c.started).max().unwrap();
    let earliest_finish = calls.iter().map(|c| c.finished).min().unwrap();
    assert!(
        latest_start < earliest_finish,
        "independent sessions should overlap"
    );
}

#[tokio::test]
async fn test_dependent_task_starts_after_dependency_finishes() {
    let h = harness(RecordingSpawner::new(Duration::from_millis(100))).await;
    let plan = Plan::new(vec![
        task("c").depends_on("b"),
        task("b").depends_on("a"),
        task("a"),
    ]);

    let outcomes = h.runner.run(&CancellationToken::new(), &plan).await.unwrap();
    let names: Vec<&str> = outcomes.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["c", "b", "a"], "outcomes follow plan order");
    assert!(outcomes.iter().all(|o| o.is_success()));

    let a = h.spawner.call_for("a").unwrap();
    let b = h.spawner.call_for("b").unwrap();
    let c = h.spawner.call_for("c").unwrap();
    assert!(b.started >= a.finished);
    assert!(c.started >= b.finished);
}

#[tokio::test]
async fn test_failed_creation_fails_dependents() {
    let h = harness(RecordingSpawner::new(Duration::ZERO)).await;
    let mut broken = task("a");
    broken.base = Some("no-such-base".to_string());
    let plan = Plan::new(vec![broken, task("b").depends_on("a"), task("c")]);

    let outcomes = h.runner.run(&CancellationToken::new(), &plan).await.unwrap();
    assert!(matches!(outcomes[0].result, Err(TaskFailure::Create(_))));
    assert!(outcomes[0].path.is_none());
    match &outcomes[1].result {
        Err(TaskFailure::DependencyFailed { dependency }) => assert_eq!(dependency, "a"),
        other => panic!("unexpected result {:?}", other),
    }
    assert!(outcomes[2].is_success());

    assert!(h.spawner.call_for("b").is_none());
    assert!(h.spawner.call_for("c").is_some());
    let registered: Vec<String> = h.store.list().unwrap().into_iter().map(|c| c.name).collect();
    assert_eq!(registered, vec!["b", "c"], "created contexts stay registered");
}

#[tokio::test]
async fn test_registration_failure_removes_working_copy() {
    let h = harness(RecordingSpawner::new(Duration::ZERO)).await;
    let taken = Context::new(
        "b",
        "elsewhere",
        h.test_repo.path().join("not-a-tree"),
        Strategy::Worktree,
    );
    h.store.add(&CancellationToken::new(), taken).await.unwrap();

    let mut b = task("b");
    b.branch = Some("fresh-b".to_string());
    let plan = Plan::new(vec![task("a"), b]);
    let outcomes = h.runner.run(&CancellationToken::new(), &plan).await.unwrap();

    assert!(outcomes[0].is_success());
    assert!(matches!(outcomes[1].result, Err(TaskFailure::Register(_))));
    assert!(!h.test_repo.state_dir().join("trees").join("b").exists());
    assert!(h.spawner.call_for("b").is_none());
}

#[tokio::test]
async fn test_cancel_during_registration_removes_worktree() {
    let h = harness(RecordingSpawner::new(Duration::ZERO)).await;
    let holder = Lock::new(h.store.lock().path());
    let _held = holder.try_acquire().unwrap().expect("lock should be free");

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        trigger.cancel();
    });

    let outcomes = h.runner.run(&cancel, &Plan::new(vec![task("a")])).await.unwrap();

    assert!(matches!(
        outcomes[0].result,
        Err(TaskFailure::Register(GroveError::LockTimeout(_)))
    ));
    assert!(!h.test_repo.state_dir().join("trees").join("a").exists());
    let repo = h.test_repo.repo().await;
    let worktrees = repo.worktree_list(&CancellationToken::new()).await.unwrap();
    assert_eq!(worktrees.len(), 1, "no worktree left registered with git");
    assert!(h.spawner.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_agent_fails_only_that_task() {
    let h = harness(RecordingSpawner::new(Duration::ZERO)).await;
    let mut lost = task("lost");
    lost.agent = "missing".to_string();
    let plan = Plan::new(vec![lost, task("fine")]);

    let outcomes = h.runner.run(&CancellationToken::new(), &plan).await.unwrap();
    match &outcomes[0].result {
        Err(TaskFailure::Agent(err)) => assert!(err.is_not_found()),
        other => panic!("unexpected result {:?}", other),
    }
    assert!(outcomes[0].path.is_some());
    assert!(outcomes[1].is_success());
}

#[tokio::test]
async fn test_spawn_failure_propagates_to_dependents() {
    let h = harness(RecordingSpawner::new(Duration::ZERO).failing_for(" a [")).await;
    let plan = Plan::new(vec![task("a"), task("b").depends_on("a")]);

    let outcomes = h.runner.run(&CancellationToken::new(), &plan).await.unwrap();
    assert!(matches!(outcomes[0].result, Err(TaskFailure::Spawn(_))));
    assert!(matches!(
        outcomes[1].result,
        Err(TaskFailure::DependencyFailed { .. })
    ));
}

#[tokio::test]
async fn test_cancelled_run_creates_nothing() {
    let h = harness(RecordingSpawner::new(Duration::ZERO)).await;
    let cancel = CancellationToken::new();
    cancel.cancel();
    let plan = Plan::new(vec![task("a"), task("b")]);

    let outcomes = h.runner.run(&cancel, &plan).await.unwrap();
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes
        .iter()
        .all(|o| matches!(o.result, Err(TaskFailure::Cancelled))));
    assert!(h.store.list().unwrap().is_empty());
    assert!(h.spawner.calls().is_empty());
}

#[tokio::test]
async fn test_invalid_plan_is_rejected_before_any_work() {
    let h = harness(RecordingSpawner::new(Duration::ZERO)).await;
    let plan = Plan::new(vec![task("a").depends_on("b"), task("b").depends_on("a")]);

    let err = h
        .runner
        .run(&CancellationToken::new(), &plan)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("cycle"), "unexpected error: {}", err);
    assert!(h.store.list().unwrap().is_empty());
}

#[tokio::test]
async fn test_session_title_and_command() {
    let h = harness(RecordingSpawner::new(Duration::ZERO)).await;
    let mut quoted = TaskDef::new("a", "x");
    quoted.prompt = "fix the 'parser' bug".to_string();
    let plan = Plan::new(vec![quoted]);

    let outcomes = h.runner.run(&CancellationToken::new(), &plan).await.unwrap();
    let call = h.spawner.call_for("a").unwrap();
    assert_eq!(call.title, "\u{1f9d9} a [x]");
    assert_eq!(Some(&call.dir), outcomes[0].path.as_ref());
    assert_eq!(
        shlex::split(&call.command).unwrap(),
        vec!["echo", "fix the 'parser' bug"]
    );

    let context = h.store.get("a").unwrap();
    assert_eq!(context.agent.as_deref(), Some("x"));
    assert_eq!(context.task.as_deref(), Some("fix the 'parser' bug"));
}
