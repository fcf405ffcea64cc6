// src/plan/execution_plan.rs

use std::sync::Arc;

use crate::dag::Project;
use crate::plan::item::{ExecutionPlanItem, MojoExecution};

/// Ordered executions satisfying one task segment for one project.
///
/// Never mutated after construction except for item completion, so it is
/// shared freely between workers (weave mode waits on other projects'
/// items).
#[derive(Debug)]
pub struct ExecutionPlan {
    project: Arc<Project>,
    /// Lifecycle phases the plan runs, including phases with no bound
    /// execution.
    phases: Vec<String>,
    items: Vec<Arc<ExecutionPlanItem>>,
}

impl ExecutionPlan {
    /// Plan covering exactly the phases its executions are bound to.
    pub fn new(project: Arc<Project>, executions: Vec<MojoExecution>) -> Self {
        let mut phases: Vec<String> = Vec::new();
        for phase in executions.iter().filter_map(|e| e.phase.as_ref()) {
            if !phases.contains(phase) {
                phases.push(phase.clone());
            }
        }
        Self::covering(project, phases, executions)
    }

    /// Plan running `phases`, some of which may have no executions.
    pub fn covering(
        project: Arc<Project>,
        phases: Vec<String>,
        executions: Vec<MojoExecution>,
    ) -> Self {
        let items = executions
            .into_iter()
            .map(|e| Arc::new(ExecutionPlanItem::new(e)))
            .collect();
        Self {
            project,
            phases,
            items,
        }
    }

    pub fn project(&self) -> &Arc<Project> {
        &self.project
    }

    pub fn items(&self) -> &[Arc<ExecutionPlanItem>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn phases(&self) -> &[String] {
        &self.phases
    }

    pub fn contains_phase(&self, phase: &str) -> bool {
        self.phases.iter().any(|p| p == phase)
    }

    /// Last item bound to `phase`, if any.
    pub fn find_last_in_phase(&self, phase: &str) -> Option<&Arc<ExecutionPlanItem>> {
        self.items.iter().rev().find(|i| i.phase() == Some(phase))
    }

    /// Complete every item still pending, releasing anyone waiting on them.
    pub fn force_all_complete(&self) {
        for item in &self.items {
            item.force_complete();
        }
    }

    pub fn is_all_done(&self) -> bool {
        self.items.iter().all(|i| i.is_done())
    }

    pub async fn wait_until_all_done(&self) {
        for item in &self.items {
            item.wait_until_done().await;
        }
    }
}
