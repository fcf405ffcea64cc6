use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use reactor::dag::Project;
use reactor::errors::MojoError;
use reactor::exec::{MojoExecutor, MojoFuture};
use reactor::plan::MojoExecution;

/// One execution the fake executor was asked to run.
#[derive(Debug, Clone)]
pub struct ExecutionRecord {
    pub project: String,
    pub execution_id: String,
    pub phase: Option<String>,
    pub start: Instant,
    pub end: Instant,
}

#[derive(Debug, Clone)]
enum Scripted {
    Fail(MojoError),
    Panic,
}

/// A fake executor that:
/// - sleeps for a per-project delay instead of running a command
/// - fails, fails fatally or panics for chosen projects
/// - records start/end instants of every execution and the peak number of
///   executions running at once.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    default_delay: Duration,
    delays: HashMap<String, Duration>,
    /// Keyed by project, optionally narrowed to one execution id.
    scripted: HashMap<(String, Option<String>), Scripted>,
    records: Mutex<Vec<ExecutionRecord>>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn with_delay(mut self, project: &str, delay: Duration) -> Self {
        self.delays.insert(project.to_string(), delay);
        self
    }

    /// Every execution of `project` fails.
    pub fn failing(mut self, project: &str) -> Self {
        self.scripted.insert(
            (project.to_string(), None),
            Scripted::Fail(MojoError::Failed(format!("scripted failure in {project}"))),
        );
        self
    }

    /// Only `execution_id` of `project` fails.
    pub fn failing_execution(mut self, project: &str, execution_id: &str) -> Self {
        self.scripted.insert(
            (project.to_string(), Some(execution_id.to_string())),
            Scripted::Fail(MojoError::Failed(format!(
                "scripted failure in {project}/{execution_id}"
            ))),
        );
        self
    }

    pub fn fatal(mut self, project: &str) -> Self {
        self.scripted.insert(
            (project.to_string(), None),
            Scripted::Fail(MojoError::Fatal(format!("scripted fatal error in {project}"))),
        );
        self
    }

    pub fn panicking(mut self, project: &str) -> Self {
        self.scripted
            .insert((project.to_string(), None), Scripted::Panic);
        self
    }

    pub fn records(&self) -> Vec<ExecutionRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Projects in the order their first execution started.
    pub fn start_order(&self) -> Vec<String> {
        let mut records = self.records();
        records.sort_by_key(|r| r.start);
        let mut order: Vec<String> = Vec::new();
        for r in records {
            if !order.contains(&r.project) {
                order.push(r.project);
            }
        }
        order
    }

    /// `(first start, last end)` of `project`'s executions.
    pub fn window(&self, project: &str) -> Option<(Instant, Instant)> {
        let records = self.records();
        let mine: Vec<_> = records.iter().filter(|r| r.project == project).collect();
        let start = mine.iter().map(|r| r.start).min()?;
        let end = mine.iter().map(|r| r.end).max()?;
        Some((start, end))
    }

    pub fn executed(&self, project: &str) -> bool {
        self.records().iter().any(|r| r.project == project)
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn script_for(&self, project: &str, execution_id: &str) -> Option<Scripted> {
        self.scripted
            .get(&(project.to_string(), Some(execution_id.to_string())))
            .or_else(|| self.scripted.get(&(project.to_string(), None)))
            .cloned()
    }
}

impl MojoExecutor for ScriptedExecutor {
    fn execute<'a>(
        &'a self,
        project: &'a Project,
        execution: &'a MojoExecution,
        phase: Option<&'a str>,
    ) -> MojoFuture<'a> {
        Box::pin(async move {
            let key = project.key().to_string();
            let delay = self
                .delays
                .get(&key)
                .copied()
                .unwrap_or(self.default_delay);

            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let start = Instant::now();

            tokio::time::sleep(delay).await;

            self.running.fetch_sub(1, Ordering::SeqCst);
            self.records.lock().unwrap().push(ExecutionRecord {
                project: key.clone(),
                execution_id: execution.execution_id.clone(),
                phase: phase.map(str::to_string),
                start,
                end: Instant::now(),
            });

            match self.script_for(&key, &execution.execution_id) {
                Some(Scripted::Fail(err)) => Err(err),
                Some(Scripted::Panic) => panic!("scripted panic in {key}"),
                None => Ok(()),
            }
        })
    }
}
