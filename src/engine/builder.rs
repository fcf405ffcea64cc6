// src/engine/builder.rs

//! Builds one project: runs its execution plan item by item.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::dag::Project;
use crate::engine::build_log::BuildLogItem;
use crate::engine::context::ReactorContext;
use crate::engine::events::ExecutionEvent;
use crate::engine::pool::run_isolated;
use crate::engine::result::{ProjectOutcome, SkipReason};
use crate::engine::weave::WeaveGate;
use crate::errors::BuildFailure;
use crate::plan::{ExecutionPlan, TaskSegment};
use crate::types::ReactorFailureBehaviour;

/// What building a project amounted to, from the scheduler's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectBuildOutcome {
    Succeeded,
    /// `releases_downstream` is set when dependents may still build
    /// (fail-never, non-fatal failure).
    Failed { releases_downstream: bool },
    Skipped,
}

impl ProjectBuildOutcome {
    /// Whether the project counts as finished for dependency purposes.
    pub fn releases_downstream(&self) -> bool {
        match self {
            ProjectBuildOutcome::Succeeded => true,
            ProjectBuildOutcome::Failed {
                releases_downstream,
            } => *releases_downstream,
            ProjectBuildOutcome::Skipped => false,
        }
    }
}

/// Executes project plans and turns every failure into status and result
/// updates. Nothing it runs ever returns an error to the caller.
#[derive(Debug, Clone)]
pub struct LifecycleModuleBuilder {
    ctx: Arc<ReactorContext>,
}

impl LifecycleModuleBuilder {
    pub fn new(ctx: Arc<ReactorContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<ReactorContext> {
        &self.ctx
    }

    /// Calculate the plan for `project`, then build it.
    pub async fn build_lazily(
        &self,
        segment_index: usize,
        segment: &TaskSegment,
        project: &Arc<Project>,
    ) -> ProjectBuildOutcome {
        if self.skip_if_ineligible(segment_index, project) {
            return ProjectBuildOutcome::Skipped;
        }
        match self.calculate_plan(segment_index, segment, project) {
            Some(plan) => self.build_project(segment_index, &plan, None).await,
            None => self.failed_outcome(false),
        }
    }

    /// Calculate the plan for `project`, recording a failure if that fails.
    pub fn calculate_plan(
        &self,
        segment_index: usize,
        segment: &TaskSegment,
        project: &Arc<Project>,
    ) -> Option<ExecutionPlan> {
        match self.ctx.calculator.calculate(project, segment) {
            Ok(plan) => Some(plan),
            Err(err) => {
                self.handle_build_error(
                    segment_index,
                    project,
                    BuildFailure::PlanCalculation(err),
                    Duration::ZERO,
                );
                None
            }
        }
    }

    /// [`calculate_plan`](Self::calculate_plan) on its own task. A panicking
    /// calculator fails the project as a lost worker.
    pub async fn calculate_plan_isolated(
        &self,
        segment_index: usize,
        segment: &Arc<TaskSegment>,
        project: &Arc<Project>,
    ) -> Option<ExecutionPlan> {
        let task = {
            let builder = self.clone();
            let segment = Arc::clone(segment);
            let project = Arc::clone(project);
            async move { builder.calculate_plan(segment_index, &segment, &project) }
        };
        match run_isolated(task).await {
            Ok(plan) => plan,
            Err(panic) => {
                self.handle_build_error(
                    segment_index,
                    project,
                    BuildFailure::Worker(panic),
                    Duration::ZERO,
                );
                None
            }
        }
    }

    /// [`build_project`](Self::build_project) without a weave gate, on its
    /// own task. A panic fails the project as a lost worker and completes
    /// its plan.
    pub async fn build_project_isolated(
        &self,
        segment_index: usize,
        plan: &Arc<ExecutionPlan>,
    ) -> ProjectBuildOutcome {
        let task = {
            let builder = self.clone();
            let plan = Arc::clone(plan);
            async move { builder.build_project(segment_index, &plan, None).await }
        };
        match run_isolated(task).await {
            Ok(outcome) => outcome,
            Err(panic) => {
                self.handle_build_error(
                    segment_index,
                    plan.project(),
                    BuildFailure::Worker(panic),
                    Duration::ZERO,
                );
                plan.force_all_complete();
                self.failed_outcome(true)
            }
        }
    }

    /// Run every item of `plan` in order.
    ///
    /// The build status is checked before the project starts and before each
    /// item. A halted or blacklisted project is recorded as skipped. Every
    /// exit path leaves all items of the plan complete, so nothing waiting on
    /// them hangs.
    pub async fn build_project(
        &self,
        segment_index: usize,
        plan: &ExecutionPlan,
        gate: Option<&WeaveGate>,
    ) -> ProjectBuildOutcome {
        let project = plan.project();
        let key = project.key();

        if self.skip_if_ineligible(segment_index, project) {
            plan.force_all_complete();
            return ProjectBuildOutcome::Skipped;
        }

        self.ctx.events.fire(&ExecutionEvent::ProjectStarted {
            project: key.clone(),
            segment: segment_index,
        });

        let mut first_start: Option<Instant> = None;
        let mut exec = Duration::ZERO;

        for item in plan.items() {
            let admission = match gate {
                Some(gate) => Some(gate.admit(project, item).await),
                None => None,
            };

            if self.skip_if_ineligible(segment_index, project) {
                plan.force_all_complete();
                return ProjectBuildOutcome::Skipped;
            }

            let execution = item.execution();
            self.ctx.events.fire(&ExecutionEvent::MojoStarted {
                project: key.clone(),
                execution: execution.clone(),
            });

            let started = Instant::now();
            first_start.get_or_insert(started);
            let result = self
                .ctx
                .executor
                .execute(project, execution, item.phase())
                .await;
            let duration = started.elapsed();
            exec += duration;

            let (waits, permit) = match admission {
                Some(a) => (a.waits, a.permit),
                None => (Vec::new(), None),
            };
            drop(permit);

            let log = BuildLogItem {
                project: key.clone(),
                execution_id: execution.execution_id.clone(),
                goal: execution.goal.clone(),
                phase: execution.phase.clone(),
                started: started.saturating_duration_since(self.ctx.build_start),
                duration,
                waits,
            };

            match result {
                Ok(()) => {
                    item.set_complete();
                    self.ctx.events.fire(&ExecutionEvent::MojoSucceeded { log });
                }
                Err(err) => {
                    self.ctx.events.fire(&ExecutionEvent::MojoFailed {
                        log,
                        error: err.clone(),
                    });
                    let failure = BuildFailure::Mojo {
                        execution: execution.to_string(),
                        source: err,
                    };
                    let fatal = failure.is_fatal();
                    let wall = first_start.map(|s| s.elapsed()).unwrap_or_default();
                    // Status first, then release waiters, so they observe it.
                    self.handle_build_error(segment_index, project, failure, wall);
                    plan.force_all_complete();
                    return self.failed_outcome(fatal);
                }
            }
        }

        let wall = first_start.map(|s| s.elapsed()).unwrap_or_default();
        self.ctx.result.record(
            project,
            segment_index,
            ProjectOutcome::Success { wall, exec },
        );
        self.ctx.events.fire(&ExecutionEvent::ProjectSucceeded {
            project: key.clone(),
            segment: segment_index,
            wall,
            exec,
        });
        ProjectBuildOutcome::Succeeded
    }

    /// Record a project failure and apply the failure behaviour to the
    /// build status.
    pub fn handle_build_error(
        &self,
        segment_index: usize,
        project: &Arc<Project>,
        failure: BuildFailure,
        wall: Duration,
    ) {
        let key = project.key();
        error!(project = %key, segment = segment_index, error = %failure, "project build failed");

        let fatal = failure.is_fatal();
        let recorded = self.ctx.result.record(
            project,
            segment_index,
            ProjectOutcome::Failure {
                cause: failure.clone(),
                wall,
            },
        );
        if recorded {
            self.ctx.events.fire(&ExecutionEvent::ProjectFailed {
                project: key.clone(),
                segment: segment_index,
                cause: failure,
            });
        }

        if fatal {
            self.ctx.status.blacklist(key);
            self.ctx.status.halt();
            return;
        }

        match self.ctx.failure_behaviour {
            ReactorFailureBehaviour::FailFast => {
                self.ctx.status.blacklist(key);
                self.ctx.status.halt();
            }
            ReactorFailureBehaviour::FailAtEnd => self.ctx.status.blacklist(key),
            ReactorFailureBehaviour::FailNever => {
                debug!(project = %key, "failure ignored (fail-never)");
            }
        }
    }

    /// Record `project` as skipped if it is not recorded yet. Returns
    /// whether a skip was recorded.
    pub fn record_skip(&self, segment_index: usize, project: &Arc<Project>, reason: SkipReason) -> bool {
        let recorded = self
            .ctx
            .result
            .record(project, segment_index, ProjectOutcome::Skipped(reason));
        if recorded {
            self.ctx.events.fire(&ExecutionEvent::ProjectSkipped {
                project: project.key().clone(),
                segment: segment_index,
                reason,
            });
        }
        recorded
    }

    /// Skip reason for `project` given the current status, if it must not run.
    pub fn ineligibility(&self, project: &Project) -> Option<SkipReason> {
        if self.ctx.status.is_halted() {
            Some(SkipReason::Halted)
        } else if self.ctx.status.is_blacklisted(project.key().as_str()) {
            Some(SkipReason::Blacklisted)
        } else {
            None
        }
    }

    fn skip_if_ineligible(&self, segment_index: usize, project: &Arc<Project>) -> bool {
        match self.ineligibility(project) {
            Some(reason) => {
                debug!(project = %project.key(), %reason, "skipping project");
                self.record_skip(segment_index, project, reason);
                true
            }
            None => false,
        }
    }

    fn failed_outcome(&self, fatal: bool) -> ProjectBuildOutcome {
        ProjectBuildOutcome::Failed {
            releases_downstream: !fatal
                && self.ctx.failure_behaviour == ReactorFailureBehaviour::FailNever,
        }
    }
}
