// src/engine/reactor.rs

//! Top-level build driver.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::config::model::ReactorSection;
use crate::dag::{DependencyGraph, Project, ProjectKey};
use crate::engine::builder::{LifecycleModuleBuilder, ProjectBuildOutcome};
use crate::engine::context::ReactorContext;
use crate::engine::events::{EventCatapult, EventSink, ExecutionEvent};
use crate::engine::pool::{ThreadPoolSizer, WorkerPool};
use crate::engine::result::{BuildResult, SkipReason};
use crate::engine::status::{HaltHandle, ReactorBuildStatus};
use crate::engine::{threaded, weave};
use crate::errors::{ReactorError, Result};
use crate::exec::MojoExecutor;
use crate::plan::{PlanCalculator, TaskSegment, calculate_task_segments};
use crate::types::ReactorFailureBehaviour;

/// What to build and how.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Goals and phases, in command order.
    pub goals: Vec<String>,
    /// Used when `goals` is empty.
    pub default_goal: Option<String>,
    /// Project aggregator goals run against.
    pub root: Option<ProjectKey>,
    /// Thread-count expression; `None` builds single-threaded unless
    /// `weave` is set.
    pub threads: Option<String>,
    pub per_core: bool,
    pub failure_behaviour: ReactorFailureBehaviour,
    pub weave: bool,
    /// Grace period for stray workers at shutdown.
    pub shutdown_grace: Duration,
}

impl Default for BuildRequest {
    fn default() -> Self {
        Self {
            goals: Vec::new(),
            default_goal: None,
            root: None,
            threads: None,
            per_core: false,
            failure_behaviour: ReactorFailureBehaviour::default(),
            weave: false,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl BuildRequest {
    pub fn new<I, S>(goals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            goals: goals.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Request taking its defaults from a `[reactor]` section.
    pub fn from_section(section: &ReactorSection, goals: Vec<String>) -> Self {
        Self {
            goals,
            default_goal: section.default_goal.clone(),
            root: section.root.as_deref().map(ProjectKey::new),
            threads: section.threads.clone(),
            per_core: section.per_core,
            failure_behaviour: section.failure_behaviour,
            weave: section.weave,
            shutdown_grace: Duration::from_millis(section.shutdown_grace_ms),
        }
    }

    pub fn with_threads(mut self, threads: impl Into<String>) -> Self {
        self.threads = Some(threads.into());
        self
    }

    pub fn with_failure_behaviour(mut self, behaviour: ReactorFailureBehaviour) -> Self {
        self.failure_behaviour = behaviour;
        self
    }

    pub fn with_weave(mut self, weave: bool) -> Self {
        self.weave = weave;
        self
    }

    pub fn with_root(mut self, root: impl Into<ProjectKey>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_default_goal(mut self, goal: impl Into<String>) -> Self {
        self.default_goal = Some(goal.into());
        self
    }

    /// Whether the build runs on a worker pool.
    pub fn is_parallel(&self) -> bool {
        self.threads.is_some() || self.weave
    }
}

/// One build invocation: the request plus the project graph it runs over.
#[derive(Debug, Clone)]
pub struct BuildSession {
    pub request: BuildRequest,
    pub graph: Arc<DependencyGraph>,
    halt: HaltHandle,
}

impl BuildSession {
    pub fn new(request: BuildRequest, graph: Arc<DependencyGraph>) -> Self {
        Self {
            request,
            graph,
            halt: HaltHandle::new(),
        }
    }

    /// Handle that halts this session's build when triggered.
    pub fn halt_handle(&self) -> HaltHandle {
        self.halt.clone()
    }
}

/// Drives a build session: segments, strategy, pool, result.
pub struct LifecycleStarter {
    calculator: Arc<dyn PlanCalculator>,
    executor: Arc<dyn MojoExecutor>,
    events: EventCatapult,
    sizer: ThreadPoolSizer,
}

impl std::fmt::Debug for LifecycleStarter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleStarter")
            .field("events", &self.events)
            .field("sizer", &self.sizer)
            .finish_non_exhaustive()
    }
}

impl LifecycleStarter {
    pub fn new(calculator: Arc<dyn PlanCalculator>, executor: Arc<dyn MojoExecutor>) -> Self {
        Self {
            calculator,
            executor,
            events: EventCatapult::new(),
            sizer: ThreadPoolSizer::new(),
        }
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events.add_sink(sink);
        self
    }

    pub fn with_pool_sizer(mut self, sizer: ThreadPoolSizer) -> Self {
        self.sizer = sizer;
        self
    }

    /// Split the session's goals into task segments.
    pub fn task_segments(&self, request: &BuildRequest) -> Result<Vec<TaskSegment>> {
        let goals = requested_goals(request)?;
        calculate_task_segments(&goals, self.calculator.as_ref())
    }

    /// Execute the build.
    ///
    /// Setup problems (no goals, unknown task, empty reactor for
    /// project-bound tasks, unknown root) are returned as errors before
    /// anything runs. Everything that goes wrong afterwards ends up in the
    /// returned [`BuildResult`].
    pub async fn execute(&self, session: BuildSession) -> Result<BuildResult> {
        let request = &session.request;
        let segments = self.task_segments(request)?;

        let graph = if session.graph.is_empty() {
            let project_bound: Vec<String> = segments
                .iter()
                .filter(|s| s.requires_project())
                .flat_map(|s| s.tasks().iter().map(ToString::to_string))
                .collect();
            if !project_bound.is_empty() {
                return Err(ReactorError::ProjectRequired(project_bound.join(", ")));
            }
            debug!("no projects; running aggregator goals standalone");
            Arc::new(DependencyGraph::standalone())
        } else {
            Arc::clone(&session.graph)
        };

        let root = match &request.root {
            Some(key) if graph.contains(key.as_str()) => Arc::clone(graph.project(key.as_str())?),
            Some(key) => return Err(ReactorError::ProjectNotInGraph(key.clone())),
            None => match graph.projects().first() {
                Some(project) => Arc::clone(project),
                None => return Err(ReactorError::ProjectRequired(request.goals.join(", "))),
            },
        };

        let status = Arc::new(ReactorBuildStatus::with_halt_handle(
            Arc::clone(&graph),
            session.halt_handle(),
        ));
        let result = Arc::new(BuildResult::new());
        let events = Arc::new(self.events.clone());
        let ctx = Arc::new(ReactorContext {
            graph: Arc::clone(&graph),
            status: Arc::clone(&status),
            result: Arc::clone(&result),
            events: Arc::clone(&events),
            calculator: Arc::clone(&self.calculator),
            executor: Arc::clone(&self.executor),
            failure_behaviour: request.failure_behaviour,
            build_start: Instant::now(),
        });
        let builder = LifecycleModuleBuilder::new(Arc::clone(&ctx));

        let segment_projects: Vec<Vec<Arc<Project>>> = segments
            .iter()
            .map(|s| {
                if s.is_aggregating() {
                    vec![Arc::clone(&root)]
                } else {
                    graph.projects().to_vec()
                }
            })
            .collect();

        let mut pool = if request.is_parallel() {
            let largest = segment_projects.iter().map(Vec::len).max().unwrap_or(1);
            let count = self
                .sizer
                .worker_count(request.threads.as_deref(), request.per_core, largest);
            info!(workers = %count, weave = request.weave, "using parallel reactor");
            Some(WorkerPool::<Arc<Project>, ProjectBuildOutcome>::new(count))
        } else {
            None
        };

        events.fire(&ExecutionEvent::SessionStarted {
            projects: graph.len(),
            segments: segments.len(),
            parallel: pool.is_some(),
        });

        for (index, (segment, projects)) in segments.iter().zip(&segment_projects).enumerate() {
            if status.is_halted() {
                for project in projects {
                    builder.record_skip(index, project, SkipReason::Halted);
                }
                continue;
            }

            events.fire(&ExecutionEvent::SegmentStarted {
                index,
                segment: segment.clone(),
                projects: projects.len(),
            });

            let outcome = match pool.as_mut() {
                Some(pool) if request.weave => {
                    weave::build_segment(&builder, pool, index, segment, projects).await
                }
                Some(pool) => {
                    let segment = Arc::new(segment.clone());
                    threaded::build_segment(&builder, pool, index, &segment, projects).await
                }
                None => build_segment_sequentially(&builder, index, segment, projects).await,
            };

            if let Err(err) = outcome {
                error!(segment = index, error = %err, "segment aborted");
                result.add_error(format!("segment {index} ({segment}): {err}"));
                status.halt();
            }

            record_unreached(&builder, index, projects);
        }

        if let Some(pool) = pool.take() {
            pool.shutdown(request.shutdown_grace).await;
        }

        events.fire(&ExecutionEvent::SessionEnded {
            succeeded: result.success_count(),
            failed: result.failure_count(),
            skipped: result.skipped_count(),
            elapsed: ctx.build_start.elapsed(),
        });

        drop(builder);
        drop(ctx);
        Ok(Arc::try_unwrap(result).unwrap_or_else(|shared| (*shared).clone()))
    }
}

fn requested_goals(request: &BuildRequest) -> Result<Vec<String>> {
    if !request.goals.is_empty() {
        return Ok(request.goals.clone());
    }
    match &request.default_goal {
        Some(goal) => Ok(goal.split_whitespace().map(str::to_string).collect()),
        None => Err(ReactorError::NoGoalsSpecified),
    }
}

/// Plans are calculated up front, then projects build one at a time in
/// build order. The segment stops at the first halt. Each calculation and
/// each project runs on its own task so a panic fails only that project.
async fn build_segment_sequentially(
    builder: &LifecycleModuleBuilder,
    segment_index: usize,
    segment: &TaskSegment,
    projects: &[Arc<Project>],
) -> Result<()> {
    let segment = Arc::new(segment.clone());
    let mut plans = Vec::with_capacity(projects.len());
    for project in projects {
        if builder.ineligibility(project).is_some() {
            continue;
        }
        if let Some(plan) = builder
            .calculate_plan_isolated(segment_index, &segment, project)
            .await
        {
            plans.push(Arc::new(plan));
        }
    }

    for plan in &plans {
        if builder.context().status.is_halted() {
            debug!(segment = segment_index, "build halted; stopping segment");
            break;
        }
        builder.build_project_isolated(segment_index, plan).await;
    }
    Ok(())
}

/// Record every project of the segment that has no outcome yet as skipped.
fn record_unreached(builder: &LifecycleModuleBuilder, segment_index: usize, projects: &[Arc<Project>]) {
    let result = &builder.context().result;
    for project in projects {
        if result.has_outcome(project, segment_index) {
            continue;
        }
        let reason = builder
            .ineligibility(project)
            .unwrap_or(SkipReason::UpstreamIncomplete);
        builder.record_skip(segment_index, project, reason);
    }
}
