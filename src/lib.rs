// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod plan;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ReactorConfig;
use crate::dag::DependencyGraph;
use crate::engine::{
    BuildRequest, BuildResult, BuildSession, HaltHandle, LifecycleStarter, ProjectOutcome,
    TracingEventSink,
};
use crate::exec::ProcessMojoExecutor;
use crate::plan::{ConfigPlanCalculator, PlanCalculator};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and validation
/// - the project graph and plan calculator
/// - the process executor
/// - Ctrl-C handling (halts the build)
///
/// Returns the process exit code.
pub async fn run(args: CliArgs) -> Result<i32> {
    let config_path = args.file.clone();
    let mut cfg = load_and_validate(&config_path)?;
    rebase_project_dirs(&mut cfg, &config_root_dir(&config_path));

    let graph = Arc::new(DependencyGraph::from_config(&cfg)?);
    let calculator: Arc<dyn PlanCalculator> = Arc::new(ConfigPlanCalculator::new(&cfg));
    let request = build_request(&args, &cfg);

    let starter = LifecycleStarter::new(Arc::clone(&calculator), Arc::new(ProcessMojoExecutor::new()))
        .with_event_sink(Arc::new(TracingEventSink));

    if args.dry_run {
        print_dry_run(&starter, &graph, calculator.as_ref(), &request)?;
        return Ok(0);
    }

    let session = BuildSession::new(request, graph);

    // Ctrl-C → halt: nothing new starts, running executions finish.
    let _interrupt = InterruptGuard::spawn(session.halt_handle());

    let result = starter.execute(session).await?;
    print_summary(&result);
    Ok(result.exit_code())
}

/// Halts the build on Ctrl-C while alive; stops listening when dropped.
struct InterruptGuard(JoinHandle<()>);

impl InterruptGuard {
    fn spawn(halt: HaltHandle) -> Self {
        Self(tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            warn!("interrupt received; halting build");
            halt.halt();
        }))
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Merge CLI overrides over the `[reactor]` section.
pub fn build_request(args: &CliArgs, cfg: &ReactorConfig) -> BuildRequest {
    let mut request = BuildRequest::from_section(&cfg.reactor, args.goals.clone());
    if let Some(threads) = &args.threads {
        request.threads = Some(threads.clone());
    }
    if let Some(behaviour) = args.failure_behaviour() {
        request.failure_behaviour = behaviour;
    }
    if args.weave {
        request.weave = true;
    }
    request
}

/// Directory relative project `dir`s are resolved against.
///
/// - If the config path has a non-empty parent (e.g. "build/Reactor.toml"),
///   that directory.
/// - For a bare filename like "Reactor.toml", the current working directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn rebase_project_dirs(cfg: &mut ReactorConfig, root: &Path) {
    for project in cfg.project.values_mut() {
        if let Some(dir) = project.dir.as_mut() {
            if Path::new(dir.as_str()).is_relative() {
                *dir = root.join(&*dir).to_string_lossy().into_owned();
            }
        }
    }
}

/// Print build order, task segments and every execution plan.
fn print_dry_run(
    starter: &LifecycleStarter,
    graph: &DependencyGraph,
    calculator: &dyn PlanCalculator,
    request: &BuildRequest,
) -> Result<()> {
    println!("reactor dry-run");
    println!("  failure_behaviour = {}", request.failure_behaviour);
    println!(
        "  threads = {}",
        request.threads.as_deref().unwrap_or("single-threaded")
    );
    println!("  weave = {}", request.weave);
    println!();

    println!("build order ({}):", graph.len());
    for project in graph.projects() {
        let upstream = graph.upstream_projects(project.key().as_str(), false)?;
        if upstream.is_empty() {
            println!("  - {}", project.key());
        } else {
            let names: Vec<&str> = upstream.iter().map(|p| p.key().as_str()).collect();
            println!("  - {} (after {})", project.key(), names.join(", "));
        }
    }

    let segments = starter.task_segments(request)?;
    let root = match &request.root {
        Some(key) => Some(Arc::clone(graph.project(key.as_str())?)),
        None => graph.projects().first().cloned(),
    };

    for (index, segment) in segments.iter().enumerate() {
        println!();
        println!("segment {index}: {segment}");
        let projects: Vec<_> = if segment.is_aggregating() {
            root.iter().cloned().collect()
        } else {
            graph.projects().to_vec()
        };
        for project in &projects {
            println!("  {}:", project.key());
            match calculator.calculate(project, segment) {
                Ok(plan) if plan.is_empty() => println!("      (nothing to do)"),
                Ok(plan) => {
                    for item in plan.items() {
                        let execution = item.execution();
                        let forked = if execution.forked { " [forked]" } else { "" };
                        println!("      {execution}{forked}: {}", execution.cmd);
                    }
                }
                Err(err) => println!("      error: {err}"),
            }
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}

/// Print the per-project outcome table to stdout.
fn print_summary(result: &BuildResult) {
    let summaries = result.summaries();
    let width = summaries
        .iter()
        .map(|s| s.project.key().as_str().len())
        .max()
        .unwrap_or(0)
        .max(20);

    println!();
    println!("Reactor Summary:");
    let mut last_segment = None;
    for summary in &summaries {
        if last_segment != Some(summary.segment) {
            println!("  segment {}:", summary.segment);
            last_segment = Some(summary.segment);
        }
        let status = match &summary.outcome {
            ProjectOutcome::Success { wall, .. } => format!("SUCCESS [{}]", format_duration(*wall)),
            ProjectOutcome::Failure { wall, .. } => format!("FAILURE [{}]", format_duration(*wall)),
            ProjectOutcome::Skipped(reason) => format!("SKIPPED ({reason})"),
        };
        println!(
            "    {:.<width$} {status}",
            format!("{} ", summary.project.key()),
            width = width + 2
        );
    }

    for summary in &summaries {
        if let ProjectOutcome::Failure { cause, .. } = &summary.outcome {
            println!("  {}: {cause}", summary.project.key());
        }
    }
    for error in result.errors() {
        println!("  error: {error}");
    }

    println!();
    if result.exit_code() == 0 {
        println!("BUILD SUCCESS");
    } else {
        println!(
            "BUILD FAILURE ({} failed, {} skipped)",
            result.failure_count(),
            result.skipped_count()
        );
    }
}

fn format_duration(d: Duration) -> String {
    if d < Duration::from_secs(1) {
        format!("{} ms", d.as_millis())
    } else {
        format!("{:.1} s", d.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn interrupt_listener_ends_with_its_guard() {
        let halt = HaltHandle::new();
        let guard = InterruptGuard::spawn(halt.clone());
        let listener = guard.0.abort_handle();

        drop(guard);

        tokio::time::timeout(Duration::from_secs(5), async {
            while !listener.is_finished() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("listener still running after its guard was dropped");
        assert!(!halt.is_halted());
    }
}
