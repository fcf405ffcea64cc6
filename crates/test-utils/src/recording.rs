use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use reactor::dag::Project;
use reactor::engine::{BuildLogItem, EventSink, ExecutionEvent};
use reactor::errors::PlanError;
use reactor::plan::{ExecutionPlan, PlanCalculator, TaskLookup, TaskSegment};

/// Event sink that keeps every event it sees.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ExecutionEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<ExecutionEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Build-log items of every successful execution.
    pub fn log_items(&self) -> Vec<BuildLogItem> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ExecutionEvent::MojoSucceeded { log } => Some(log),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&ExecutionEvent) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn on_event(&self, event: &ExecutionEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Event sink that panics on every event.
#[derive(Debug, Default)]
pub struct PanickingSink;

impl EventSink for PanickingSink {
    fn on_event(&self, _event: &ExecutionEvent) {
        panic!("sink failure");
    }
}

/// Wraps a calculator and fails plan calculation for chosen projects.
pub struct FailingCalculator<C> {
    inner: C,
    fail_for: HashSet<String>,
    panic_for: HashSet<String>,
}

impl<C: PlanCalculator> FailingCalculator<C> {
    pub fn new(inner: C, fail_for: &[&str]) -> Self {
        Self {
            inner,
            fail_for: fail_for.iter().map(|s| s.to_string()).collect(),
            panic_for: HashSet::new(),
        }
    }

    /// Panic instead of returning an error when planning `project`.
    pub fn panicking(mut self, project: &str) -> Self {
        self.panic_for.insert(project.to_string());
        self
    }
}

impl<C: PlanCalculator> PlanCalculator for FailingCalculator<C> {
    fn lookup_task(&self, token: &str) -> TaskLookup {
        self.inner.lookup_task(token)
    }

    fn available_phases(&self) -> Vec<String> {
        self.inner.available_phases()
    }

    fn calculate(
        &self,
        project: &Arc<Project>,
        segment: &TaskSegment,
    ) -> Result<ExecutionPlan, PlanError> {
        if self.panic_for.contains(project.key().as_str()) {
            panic!("scripted calculator panic for {}", project.key());
        }
        if self.fail_for.contains(project.key().as_str()) {
            return Err(PlanError::Other(format!(
                "cannot resolve plugins for {}",
                project.key()
            )));
        }
        self.inner.calculate(project, segment)
    }
}
