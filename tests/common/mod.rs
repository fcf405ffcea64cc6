#![allow(dead_code)]

use std::sync::Arc;

use reactor::config::ReactorConfig;
use reactor::dag::DependencyGraph;
use reactor::engine::{BuildRequest, BuildResult, BuildSession, LifecycleStarter, ProjectOutcome};
use reactor::plan::{ConfigPlanCalculator, PlanCalculator};
use reactor_test_utils::fake_executor::ScriptedExecutor;
use reactor_test_utils::recording::RecordingSink;

pub use reactor_test_utils::{init_tracing, with_timeout};

/// Starter over `cfg` with a scripted executor and a recording sink.
pub fn starter(
    cfg: &ReactorConfig,
    executor: &Arc<ScriptedExecutor>,
    sink: &Arc<RecordingSink>,
) -> LifecycleStarter {
    let calculator: Arc<dyn PlanCalculator> = Arc::new(ConfigPlanCalculator::new(cfg));
    LifecycleStarter::new(calculator, executor.clone()).with_event_sink(sink.clone())
}

pub fn session(cfg: &ReactorConfig, request: BuildRequest) -> BuildSession {
    let graph = DependencyGraph::from_config(cfg).expect("valid graph");
    BuildSession::new(request, Arc::new(graph))
}

/// Run a full build of `cfg` against `executor`, bounded by a timeout.
pub async fn run_build(
    cfg: &ReactorConfig,
    executor: &Arc<ScriptedExecutor>,
    request: BuildRequest,
) -> BuildResult {
    let sink = RecordingSink::new();
    run_build_with_sink(cfg, executor, &sink, request).await
}

pub async fn run_build_with_sink(
    cfg: &ReactorConfig,
    executor: &Arc<ScriptedExecutor>,
    sink: &Arc<RecordingSink>,
    request: BuildRequest,
) -> BuildResult {
    let starter = starter(cfg, executor, sink);
    with_timeout(starter.execute(session(cfg, request)))
        .await
        .expect("build setup failed")
}

/// Assert `upstream` finished before `downstream` started.
pub fn assert_finished_before(executor: &ScriptedExecutor, upstream: &str, downstream: &str) {
    let (_, up_end) = executor
        .window(upstream)
        .unwrap_or_else(|| panic!("{upstream} never ran"));
    let (down_start, _) = executor
        .window(downstream)
        .unwrap_or_else(|| panic!("{downstream} never ran"));
    assert!(
        up_end <= down_start,
        "{downstream} started before {upstream} finished"
    );
}

pub fn outcome(result: &BuildResult, key: &str) -> ProjectOutcome {
    result
        .outcome(key, 0)
        .unwrap_or_else(|| panic!("no outcome recorded for {key}"))
}
