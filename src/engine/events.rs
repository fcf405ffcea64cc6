// src/engine/events.rs

//! Build event notifications.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::dag::ProjectKey;
use crate::engine::build_log::BuildLogItem;
use crate::engine::result::SkipReason;
use crate::errors::{BuildFailure, MojoError};
use crate::plan::{MojoExecution, TaskSegment};

/// Boundaries of a build the reactor reports to its sinks.
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    SessionStarted {
        projects: usize,
        segments: usize,
        parallel: bool,
    },
    SegmentStarted {
        index: usize,
        segment: TaskSegment,
        projects: usize,
    },
    ProjectStarted {
        project: ProjectKey,
        segment: usize,
    },
    ProjectSucceeded {
        project: ProjectKey,
        segment: usize,
        wall: Duration,
        exec: Duration,
    },
    ProjectFailed {
        project: ProjectKey,
        segment: usize,
        cause: BuildFailure,
    },
    ProjectSkipped {
        project: ProjectKey,
        segment: usize,
        reason: SkipReason,
    },
    MojoStarted {
        project: ProjectKey,
        execution: MojoExecution,
    },
    MojoSucceeded {
        log: BuildLogItem,
    },
    MojoFailed {
        log: BuildLogItem,
        error: MojoError,
    },
    SessionEnded {
        succeeded: usize,
        failed: usize,
        skipped: usize,
        elapsed: Duration,
    },
}

/// Receiver of build events.
///
/// Called synchronously from worker tasks: implementations must return
/// quickly and should not block.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &ExecutionEvent);
}

/// Fans events out to every registered sink.
///
/// A panicking sink is logged and otherwise ignored; it never unwinds into
/// the scheduler.
#[derive(Default, Clone)]
pub struct EventCatapult {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl std::fmt::Debug for EventCatapult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventCatapult")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl EventCatapult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sink(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn fire(&self, event: &ExecutionEvent) {
        for sink in &self.sinks {
            if catch_unwind(AssertUnwindSafe(|| sink.on_event(event))).is_err() {
                error!(?event, "event sink panicked; event dropped for that sink");
            }
        }
    }
}

/// Sink that logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn on_event(&self, event: &ExecutionEvent) {
        match event {
            ExecutionEvent::SessionStarted {
                projects,
                segments,
                parallel,
            } => info!(projects, segments, parallel, "reactor build started"),
            ExecutionEvent::SegmentStarted {
                index,
                segment,
                projects,
            } => info!(segment = index, tasks = %segment, projects, "building task segment"),
            ExecutionEvent::ProjectStarted { project, segment } => {
                info!(project = %project, segment, "building project")
            }
            ExecutionEvent::ProjectSucceeded {
                project,
                segment,
                wall,
                exec,
            } => info!(
                project = %project,
                segment,
                wall_ms = wall.as_millis() as u64,
                exec_ms = exec.as_millis() as u64,
                "project succeeded"
            ),
            ExecutionEvent::ProjectFailed {
                project,
                segment,
                cause,
            } => error!(project = %project, segment, error = %cause, "project failed"),
            ExecutionEvent::ProjectSkipped {
                project,
                segment,
                reason,
            } => warn!(project = %project, segment, %reason, "project skipped"),
            ExecutionEvent::MojoStarted { project, execution } => debug!(
                project = %project,
                execution = %execution.execution_id,
                goal = %execution.goal,
                phase = execution.phase.as_deref().unwrap_or("-"),
                forked = execution.forked,
                "execution started"
            ),
            ExecutionEvent::MojoSucceeded { log } => debug!(log = %log, "execution succeeded"),
            ExecutionEvent::MojoFailed { log, error } => {
                error!(log = %log, error = %error, "execution failed")
            }
            ExecutionEvent::SessionEnded {
                succeeded,
                failed,
                skipped,
                elapsed,
            } => info!(
                succeeded,
                failed,
                skipped,
                elapsed_ms = elapsed.as_millis() as u64,
                "reactor build finished"
            ),
        }
    }
}
