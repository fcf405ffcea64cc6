// tests/scheduler_scenarios.rs

mod common;
use crate::common::{assert_finished_before, init_tracing, outcome, run_build};

use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reactor::engine::{BuildRequest, ProjectOutcome, SkipReason};
use reactor::errors::{BuildFailure, MojoError};
use reactor_test_utils::builders::compile_config;
use reactor_test_utils::fake_executor::ScriptedExecutor;

type TestResult = Result<(), Box<dyn Error>>;

const DIAMOND: &[(&str, &[&str])] = &[
    ("g:a", &[]),
    ("g:b", &["g:a"]),
    ("g:c", &["g:a"]),
    ("g:d", &["g:b", "g:c"]),
];

fn parallel(threads: &str) -> BuildRequest {
    BuildRequest::new(["compile"]).with_threads(threads)
}

#[tokio::test]
async fn linear_chain_builds_in_dependency_order() -> TestResult {
    init_tracing();

    let cfg = compile_config(&[("g:a", &[]), ("g:b", &["g:a"]), ("g:c", &["g:b"])]).build();
    let executor = Arc::new(ScriptedExecutor::new().with_default_delay(Duration::from_millis(20)));

    let result = run_build(&cfg, &executor, parallel("4")).await;

    assert_eq!(result.success_count(), 3);
    assert_eq!(result.failure_count(), 0);
    assert_eq!(result.exit_code(), 0);
    assert_finished_before(&executor, "g:a", "g:b");
    assert_finished_before(&executor, "g:b", "g:c");
    assert_eq!(executor.start_order(), vec!["g:a", "g:b", "g:c"]);
    Ok(())
}

#[tokio::test]
async fn diamond_waits_for_both_branches() -> TestResult {
    init_tracing();

    let cfg = compile_config(DIAMOND).build();
    let executor = Arc::new(
        ScriptedExecutor::new()
            .with_default_delay(Duration::from_millis(20))
            .with_delay("g:b", Duration::from_millis(150))
            .with_delay("g:c", Duration::from_millis(50)),
    );

    let result = run_build(&cfg, &executor, parallel("4")).await;

    assert_eq!(result.success_count(), 4);
    assert_finished_before(&executor, "g:a", "g:b");
    assert_finished_before(&executor, "g:a", "g:c");
    assert_finished_before(&executor, "g:b", "g:d");
    assert_finished_before(&executor, "g:c", "g:d");

    // b and c overlap: neither waits for the other.
    let (b_start, b_end) = executor.window("g:b").ok_or("b never ran")?;
    let (c_start, c_end) = executor.window("g:c").ok_or("c never ran")?;
    assert!(c_start < b_end && b_start < c_end, "b and c did not run concurrently");

    // a ran exactly once.
    let a_runs = executor
        .records()
        .iter()
        .filter(|r| r.project == "g:a")
        .count();
    assert_eq!(a_runs, 1);
    Ok(())
}

#[tokio::test]
async fn independent_projects_respect_worker_limit() -> TestResult {
    init_tracing();

    let cfg = compile_config(&[("g:x", &[]), ("g:y", &[]), ("g:z", &[])]).build();
    let per_project = Duration::from_millis(200);
    let executor = Arc::new(ScriptedExecutor::new().with_default_delay(per_project));

    let started = Instant::now();
    let result = run_build(&cfg, &executor, parallel("2")).await;
    let elapsed = started.elapsed();

    assert_eq!(result.success_count(), 3);
    assert!(
        executor.peak_concurrency() <= 2,
        "peak concurrency was {}",
        executor.peak_concurrency()
    );
    assert_eq!(executor.peak_concurrency(), 2);
    assert!(
        elapsed < per_project * 3,
        "build took {elapsed:?}, no faster than running serially"
    );
    Ok(())
}

#[tokio::test]
async fn failing_root_skips_whole_diamond() -> TestResult {
    init_tracing();

    let cfg = compile_config(DIAMOND).build();
    let executor = Arc::new(ScriptedExecutor::new().failing("g:a"));

    let result = run_build(&cfg, &executor, parallel("4")).await;

    assert_eq!(result.failure_count(), 1);
    assert_eq!(result.skipped_count(), 3);
    assert_eq!(result.success_count(), 0);
    assert_eq!(result.exit_code(), 1);

    match outcome(&result, "g:a") {
        ProjectOutcome::Failure {
            cause: BuildFailure::Mojo { source, .. },
            ..
        } => assert!(matches!(source, MojoError::Failed(_))),
        other => panic!("expected mojo failure for a, got {other:?}"),
    }
    for key in ["g:b", "g:c", "g:d"] {
        assert_eq!(
            outcome(&result, key),
            ProjectOutcome::Skipped(SkipReason::Blacklisted),
            "{key}"
        );
        assert!(!executor.executed(key), "{key} should not have run");
    }
    Ok(())
}

#[tokio::test]
async fn failure_only_skips_downstream_of_failed_project() -> TestResult {
    init_tracing();

    // a <- b <- d, a <- c; plus an unrelated e.
    let cfg = compile_config(&[
        ("g:a", &[]),
        ("g:b", &["g:a"]),
        ("g:c", &["g:a"]),
        ("g:d", &["g:b"]),
        ("g:e", &[]),
    ])
    .build();
    let executor = Arc::new(
        ScriptedExecutor::new()
            .with_default_delay(Duration::from_millis(10))
            .failing("g:b"),
    );

    let result = run_build(&cfg, &executor, parallel("4")).await;

    assert!(outcome(&result, "g:a").is_success());
    assert!(outcome(&result, "g:b").is_failure());
    assert!(outcome(&result, "g:c").is_success());
    assert_eq!(
        outcome(&result, "g:d"),
        ProjectOutcome::Skipped(SkipReason::Blacklisted)
    );
    assert!(outcome(&result, "g:e").is_success());
    assert_eq!(result.len(), 5);
    Ok(())
}

#[tokio::test]
async fn single_threaded_build_follows_build_order() -> TestResult {
    init_tracing();

    let cfg = compile_config(DIAMOND).build();
    let executor = Arc::new(ScriptedExecutor::new().with_default_delay(Duration::from_millis(5)));

    let result = run_build(&cfg, &executor, BuildRequest::new(["compile"])).await;

    assert_eq!(result.success_count(), 4);
    assert_eq!(executor.peak_concurrency(), 1);
    assert_eq!(executor.start_order(), vec!["g:a", "g:b", "g:c", "g:d"]);
    Ok(())
}

#[tokio::test]
async fn success_outcome_carries_timing() -> TestResult {
    init_tracing();

    let cfg = compile_config(&[("g:a", &[])]).build();
    let executor = Arc::new(ScriptedExecutor::new().with_default_delay(Duration::from_millis(30)));

    let result = run_build(&cfg, &executor, parallel("1")).await;

    match outcome(&result, "g:a") {
        ProjectOutcome::Success { wall, exec } => {
            assert!(exec >= Duration::from_millis(30));
            assert!(wall >= exec);
        }
        other => panic!("expected success, got {other:?}"),
    }
    Ok(())
}
