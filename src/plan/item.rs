// src/plan/item.rs

use std::fmt;

use tokio::sync::watch;

/// One resolved mojo execution: a command bound (optionally) to a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MojoExecution {
    /// Execution id, unique within a project's plan for a given goal.
    pub execution_id: String,
    /// `prefix:goal` for plugin goals, `exec` for lifecycle bindings.
    pub goal: String,
    /// Lifecycle phase the execution runs in, if any.
    pub phase: Option<String>,
    pub cmd: String,
    /// Part of a lifecycle forked by a goal, rather than requested directly.
    pub forked: bool,
}

impl MojoExecution {
    pub fn new(goal: impl Into<String>, execution_id: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            execution_id: execution_id.into(),
            goal: goal.into(),
            phase: None,
            cmd: cmd.into(),
            forked: false,
        }
    }

    pub fn in_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    pub fn forked(mut self, forked: bool) -> Self {
        self.forked = forked;
        self
    }
}

impl fmt::Display for MojoExecution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.goal, self.execution_id)?;
        if let Some(phase) = &self.phase {
            write!(f, " @ {phase}")?;
        }
        Ok(())
    }
}

/// A [`MojoExecution`] plus its one-way completion state.
///
/// Completion is `pending -> complete` exactly once. Waiters subscribe to a
/// `watch` channel, so a waiter arriving after completion sees the stored
/// value immediately instead of missing a notification.
#[derive(Debug)]
pub struct ExecutionPlanItem {
    execution: MojoExecution,
    done: watch::Sender<bool>,
}

impl ExecutionPlanItem {
    pub fn new(execution: MojoExecution) -> Self {
        let (done, _) = watch::channel(false);
        Self { execution, done }
    }

    pub fn execution(&self) -> &MojoExecution {
        &self.execution
    }

    pub fn phase(&self) -> Option<&str> {
        self.execution.phase.as_deref()
    }

    /// Mark the item complete after a successful execution.
    ///
    /// Returns `true` if this call performed the transition, `false` if the
    /// item was already complete.
    pub fn set_complete(&self) -> bool {
        self.done.send_if_modified(|done| {
            if *done {
                false
            } else {
                *done = true;
                true
            }
        })
    }

    /// Complete the item on an abort path. Idempotent.
    pub fn force_complete(&self) {
        self.set_complete();
    }

    pub fn is_done(&self) -> bool {
        *self.done.borrow()
    }

    /// Resolve once the item is complete; immediately if it already is.
    pub async fn wait_until_done(&self) {
        let mut rx = self.done.subscribe();
        // The sender lives as long as `self`, so this cannot observe a
        // closed channel.
        let _ = rx.wait_for(|done| *done).await;
    }
}
