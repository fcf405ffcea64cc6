// src/plan/calculator.rs

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::config::model::{ExecutionConfig, GoalConfig, PluginConfig, ProjectConfig, ReactorConfig};
use crate::dag::Project;
use crate::errors::PlanError;
use crate::plan::execution_plan::ExecutionPlan;
use crate::plan::item::MojoExecution;
use crate::plan::segment::{ResolvedGoal, Task, TaskLookup, TaskSegment, parse_goal_spec};

/// Goal name used for executions bound to a lifecycle phase.
pub const LIFECYCLE_GOAL: &str = "exec";

/// Resolves tasks and computes execution plans.
///
/// Calls may be slow and may fail; the scheduler treats a failure as a
/// failure of the project being planned.
pub trait PlanCalculator: Send + Sync {
    /// Interpret a command-line token as a goal or a lifecycle phase.
    fn lookup_task(&self, token: &str) -> TaskLookup;

    /// Lifecycle phases, in order.
    fn available_phases(&self) -> Vec<String>;

    /// Ordered executions needed to satisfy `segment` for `project`.
    fn calculate(
        &self,
        project: &Arc<Project>,
        segment: &TaskSegment,
    ) -> Result<ExecutionPlan, PlanError>;
}

/// [`PlanCalculator`] backed by the `[lifecycle]`, `[default]`, `[plugin]`
/// and `[project]` sections of a build descriptor.
#[derive(Debug, Clone)]
pub struct ConfigPlanCalculator {
    phases: Vec<String>,
    defaults: Vec<ExecutionConfig>,
    plugins: BTreeMap<String, PluginConfig>,
    projects: BTreeMap<String, ProjectConfig>,
}

impl ConfigPlanCalculator {
    pub fn new(cfg: &ReactorConfig) -> Self {
        Self {
            phases: cfg.lifecycle.phases.clone(),
            defaults: cfg.default.execution.clone(),
            plugins: cfg.plugin.clone(),
            projects: cfg.project.clone(),
        }
    }

    fn goal_config(&self, prefix: &str, goal: &str) -> Option<&GoalConfig> {
        self.plugins.get(prefix).and_then(|p| p.goal.get(goal))
    }

    fn phase_index(&self, phase: &str) -> Result<usize, PlanError> {
        self.phases
            .iter()
            .position(|p| p == phase)
            .ok_or_else(|| PlanError::UnknownPhase(phase.to_string()))
    }

    /// Executions bound to `phase` for `project`: inherited defaults first,
    /// then the project's own, in declaration order.
    fn phase_executions(&self, project: &Project, phase: &str, forked: bool) -> Vec<MojoExecution> {
        let own = self
            .projects
            .get(project.key().as_str())
            .map(|pc| pc.execution.as_slice())
            .unwrap_or_default();

        self.defaults
            .iter()
            .chain(own.iter())
            .filter(|e| e.phase == phase)
            .enumerate()
            .map(|(n, e)| {
                let id = e.id.clone().unwrap_or_else(|| format!("{phase}-{}", n + 1));
                MojoExecution::new(LIFECYCLE_GOAL, id, e.cmd.as_str())
                    .in_phase(phase)
                    .forked(forked)
            })
            .collect()
    }
}

impl PlanCalculator for ConfigPlanCalculator {
    fn lookup_task(&self, token: &str) -> TaskLookup {
        if let Some((prefix, goal, execution_id)) = parse_goal_spec(token) {
            if let Some(gc) = self.goal_config(prefix, goal) {
                return TaskLookup::Goal(ResolvedGoal {
                    prefix: prefix.to_string(),
                    goal: goal.to_string(),
                    execution_id: execution_id.to_string(),
                    aggregator: gc.aggregator,
                });
            }
            if self.plugins.contains_key(prefix) {
                return TaskLookup::NotFound(token.to_string());
            }
            debug!(token, "no plugin for prefix; trying as lifecycle phase");
        }

        if self.phases.iter().any(|p| p == token) {
            TaskLookup::Phase(token.to_string())
        } else {
            TaskLookup::NotFound(token.to_string())
        }
    }

    fn available_phases(&self) -> Vec<String> {
        self.phases.clone()
    }

    fn calculate(
        &self,
        project: &Arc<Project>,
        segment: &TaskSegment,
    ) -> Result<ExecutionPlan, PlanError> {
        let mut planned: HashSet<&str> = HashSet::new();
        let mut covered: Vec<String> = Vec::new();
        let mut executions = Vec::new();

        for task in segment.tasks() {
            match task {
                Task::Phase(phase) => {
                    let upto = self.phase_index(phase)?;
                    for phase in &self.phases[..=upto] {
                        if planned.insert(phase.as_str()) {
                            covered.push(phase.clone());
                            executions.extend(self.phase_executions(project, phase, false));
                        }
                    }
                }
                Task::Goal(goal) => {
                    let gc = self.goal_config(&goal.prefix, &goal.goal).ok_or_else(|| {
                        PlanError::UnknownGoal {
                            prefix: goal.prefix.clone(),
                            goal: goal.goal.clone(),
                        }
                    })?;

                    if let Some(fork) = &gc.fork_phase {
                        let upto = self.phase_index(fork)?;
                        for phase in &self.phases[..=upto] {
                            if !covered.contains(phase) {
                                covered.push(phase.clone());
                            }
                            executions.extend(self.phase_executions(project, phase, true));
                        }
                    }

                    let mut execution = MojoExecution::new(
                        format!("{}:{}", goal.prefix, goal.goal),
                        goal.execution_id.as_str(),
                        gc.cmd.as_str(),
                    );
                    if let Some(phase) = &gc.phase {
                        if !covered.contains(phase) {
                            covered.push(phase.clone());
                        }
                        execution = execution.in_phase(phase.as_str());
                    }
                    executions.push(execution);
                }
            }
        }

        debug!(
            project = %project.key(),
            segment = %segment,
            items = executions.len(),
            "calculated execution plan"
        );
        Ok(ExecutionPlan::covering(
            Arc::clone(project),
            covered,
            executions,
        ))
    }
}
