// tests/plan_items.rs

mod common;
use crate::common::with_timeout;

use std::sync::Arc;
use std::time::Duration;

use reactor::dag::Project;
use reactor::plan::{ExecutionPlan, ExecutionPlanItem, MojoExecution};

fn exec(id: &str, phase: &str) -> MojoExecution {
    MojoExecution::new("exec", id, format!("run {id}")).in_phase(phase)
}

#[tokio::test]
async fn wait_returns_immediately_when_already_complete() {
    let item = ExecutionPlanItem::new(exec("compile-1", "compile"));
    assert!(item.set_complete());
    with_timeout(item.wait_until_done()).await;
    assert!(item.is_done());
}

#[tokio::test]
async fn waiters_started_before_completion_are_released() {
    let item = Arc::new(ExecutionPlanItem::new(exec("compile-1", "compile")));

    let mut waiters = Vec::new();
    for _ in 0..8 {
        let item = Arc::clone(&item);
        waiters.push(tokio::spawn(async move { item.wait_until_done().await }));
    }

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!item.is_done());
    item.set_complete();

    for waiter in waiters {
        with_timeout(waiter).await.unwrap();
    }
}

#[tokio::test]
async fn completion_is_one_way_and_idempotent() {
    let item = ExecutionPlanItem::new(exec("test-1", "test"));

    item.force_complete();
    item.force_complete();
    assert!(!item.set_complete(), "second transition must be a no-op");
    assert!(item.is_done());

    // Late waiters still return.
    with_timeout(item.wait_until_done()).await;
    with_timeout(item.wait_until_done()).await;
}

#[tokio::test]
async fn racing_completers_transition_exactly_once() {
    let item = Arc::new(ExecutionPlanItem::new(exec("test-1", "test")));

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let item = Arc::clone(&item);
        tasks.push(tokio::spawn(async move { item.set_complete() }));
    }

    let mut transitions = 0;
    for task in tasks {
        if task.await.unwrap() {
            transitions += 1;
        }
    }
    assert_eq!(transitions, 1);
}

#[tokio::test]
async fn plan_lookups_and_force_all_complete() {
    let project = Arc::new(Project::new("g:a"));
    let plan = ExecutionPlan::covering(
        project,
        vec!["compile".into(), "test".into(), "package".into()],
        vec![
            exec("compile-1", "compile"),
            exec("compile-2", "compile"),
            exec("test-1", "test"),
        ],
    );

    assert_eq!(plan.len(), 3);
    assert!(plan.contains_phase("package"));
    assert!(!plan.contains_phase("install"));
    assert_eq!(
        plan.find_last_in_phase("compile")
            .map(|i| i.execution().execution_id.as_str()),
        Some("compile-2")
    );
    assert!(plan.find_last_in_phase("package").is_none());

    assert!(!plan.is_all_done());
    plan.items()[0].set_complete();
    plan.force_all_complete();
    assert!(plan.is_all_done());
    with_timeout(plan.wait_until_all_done()).await;
}

#[test]
fn plan_without_explicit_phases_covers_bound_phases() {
    let plan = ExecutionPlan::new(
        Arc::new(Project::new("g:a")),
        vec![exec("compile-1", "compile"), exec("test-1", "test"), exec("compile-2", "compile")],
    );
    assert_eq!(plan.phases(), ["compile", "test"]);
}
