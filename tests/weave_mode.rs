// tests/weave_mode.rs

mod common;
use crate::common::{init_tracing, outcome, run_build, run_build_with_sink};

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use reactor::engine::{BuildRequest, ProjectOutcome, SkipReason, WaitTarget};
use reactor_test_utils::builders::{ProjectConfigBuilder, ReactorConfigBuilder, goal};
use reactor_test_utils::fake_executor::{ExecutionRecord, ScriptedExecutor};
use reactor_test_utils::recording::RecordingSink;

type TestResult = Result<(), Box<dyn Error>>;

fn record<'a>(records: &'a [ExecutionRecord], project: &str, id: &str) -> &'a ExecutionRecord {
    records
        .iter()
        .find(|r| r.project == project && r.execution_id == id)
        .unwrap_or_else(|| panic!("{project}/{id} never ran"))
}

/// a <- b, both with one compile and one test execution.
fn two_phase_chain() -> ReactorConfigBuilder {
    let project = |deps: &[&str]| {
        deps.iter()
            .fold(ProjectConfigBuilder::new(), |p, d| p.depends_on(d))
            .execution("compile", "compile")
            .execution("test", "test")
            .build()
    };
    ReactorConfigBuilder::new()
        .with_project("g:a", project(&[]))
        .with_project("g:b", project(&["g:a"]))
}

fn weave(goals: &[&str], threads: &str) -> BuildRequest {
    BuildRequest::new(goals.iter().copied())
        .with_threads(threads)
        .with_weave(true)
}

#[tokio::test]
async fn downstream_phase_starts_once_upstream_phase_is_done() -> TestResult {
    init_tracing();

    let cfg = two_phase_chain().build();
    let executor = Arc::new(
        ScriptedExecutor::new()
            .with_delay("g:a", Duration::from_millis(100))
            .with_delay("g:b", Duration::from_millis(10)),
    );
    let sink = RecordingSink::new();

    let result = run_build_with_sink(&cfg, &executor, &sink, weave(&["test"], "2")).await;
    assert_eq!(result.success_count(), 2);

    let records = executor.records();
    let a_compile = record(&records, "g:a", "compile-1");
    let a_test = record(&records, "g:a", "test-1");
    let b_compile = record(&records, "g:b", "compile-1");
    let b_test = record(&records, "g:b", "test-1");

    assert!(b_compile.start >= a_compile.end, "b compiled before a did");
    assert!(
        b_compile.start < a_test.end,
        "b waited for all of a instead of a's compile phase"
    );
    assert!(b_test.start >= a_test.end, "b tested before a did");

    let b_compile_log = sink
        .log_items()
        .into_iter()
        .find(|l| l.project.as_str() == "g:b" && l.execution_id == "compile-1")
        .ok_or("no log item for b compile")?;
    assert_eq!(b_compile_log.waits.len(), 1);
    assert_eq!(b_compile_log.waits[0].upstream.as_str(), "g:a");
    assert_eq!(
        b_compile_log.waits[0].target,
        WaitTarget::Item {
            execution_id: "compile-1".to_string()
        }
    );
    Ok(())
}

#[tokio::test]
async fn waiting_projects_do_not_hold_worker_slots() -> TestResult {
    init_tracing();

    // One worker: if a waiting b held it, a could never continue.
    let cfg = two_phase_chain().build();
    let executor = Arc::new(ScriptedExecutor::new().with_default_delay(Duration::from_millis(10)));

    let result = run_build(&cfg, &executor, weave(&["test"], "1")).await;

    assert_eq!(result.success_count(), 2);
    assert_eq!(executor.peak_concurrency(), 1);
    Ok(())
}

#[tokio::test]
async fn upstream_failure_releases_and_skips_waiters() -> TestResult {
    init_tracing();

    let cfg = two_phase_chain()
        .with_project(
            "g:c",
            ProjectConfigBuilder::new()
                .execution("compile", "compile")
                .build(),
        )
        .build();
    let executor = Arc::new(
        ScriptedExecutor::new()
            .with_default_delay(Duration::from_millis(20))
            .failing_execution("g:a", "compile-1"),
    );

    let result = run_build(&cfg, &executor, weave(&["test"], "4")).await;

    assert!(outcome(&result, "g:a").is_failure());
    assert_eq!(
        outcome(&result, "g:b"),
        ProjectOutcome::Skipped(SkipReason::Blacklisted)
    );
    assert!(outcome(&result, "g:c").is_success());
    assert!(!executor.executed("g:b"));
    Ok(())
}

#[tokio::test]
async fn phase_without_bound_upstream_item_does_not_wait() -> TestResult {
    init_tracing();

    // a only tests; b only compiles. Both plans run compile.
    let cfg = ReactorConfigBuilder::new()
        .with_project(
            "g:a",
            ProjectConfigBuilder::new().execution("test", "test").build(),
        )
        .with_project(
            "g:b",
            ProjectConfigBuilder::new()
                .depends_on("g:a")
                .execution("compile", "compile")
                .build(),
        )
        .build();
    let executor = Arc::new(
        ScriptedExecutor::new()
            .with_delay("g:a", Duration::from_millis(150))
            .with_delay("g:b", Duration::from_millis(10)),
    );
    let sink = RecordingSink::new();

    let result = run_build_with_sink(&cfg, &executor, &sink, weave(&["test"], "2")).await;
    assert_eq!(result.success_count(), 2);

    let records = executor.records();
    let a_test = record(&records, "g:a", "test-1");
    let b_compile = record(&records, "g:b", "compile-1");
    assert!(b_compile.start < a_test.end);

    let b_log = sink
        .log_items()
        .into_iter()
        .find(|l| l.project.as_str() == "g:b")
        .ok_or("no log item for b")?;
    assert_eq!(b_log.waits[0].target, WaitTarget::NotScheduled);
    Ok(())
}

#[tokio::test]
async fn phaseless_goal_waits_for_whole_upstream_plan() -> TestResult {
    init_tracing();

    let cfg = two_phase_chain().with_goal("tool", "run", goal("run")).build();
    let executor = Arc::new(
        ScriptedExecutor::new()
            .with_delay("g:a", Duration::from_millis(60))
            .with_delay("g:b", Duration::from_millis(5)),
    );
    let sink = RecordingSink::new();

    let result =
        run_build_with_sink(&cfg, &executor, &sink, weave(&["compile", "tool:run"], "2")).await;
    assert_eq!(result.success_count(), 2);

    let records = executor.records();
    let a_last_end = records
        .iter()
        .filter(|r| r.project == "g:a")
        .map(|r| r.end)
        .max()
        .ok_or("a never ran")?;
    let b_run = record(&records, "g:b", "default-cli");
    assert!(b_run.start >= a_last_end);

    let b_run_log = sink
        .log_items()
        .into_iter()
        .find(|l| l.project.as_str() == "g:b" && l.execution_id == "default-cli")
        .ok_or("no log item for b tool:run")?;
    assert_eq!(b_run_log.waits[0].target, WaitTarget::WholePlan);
    Ok(())
}
