// src/engine/build_log.rs

//! Per-item timing and wait diagnostics.

use std::fmt;
use std::time::Duration;

use crate::dag::ProjectKey;

/// What a weave-mode item waited on before it could run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitTarget {
    /// The upstream project's last item in the same phase.
    Item { execution_id: String },
    /// The upstream project's whole plan.
    WholePlan,
    /// The upstream project runs the phase but has nothing bound to it.
    NotScheduled,
}

/// One dependency an item waited on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitEdge {
    pub upstream: ProjectKey,
    pub target: WaitTarget,
    pub waited: Duration,
}

impl fmt::Display for WaitEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            WaitTarget::Item { execution_id } => write!(
                f,
                "{}#{} ({} ms)",
                self.upstream,
                execution_id,
                self.waited.as_millis()
            ),
            WaitTarget::WholePlan => {
                write!(f, "{}#* ({} ms)", self.upstream, self.waited.as_millis())
            }
            WaitTarget::NotScheduled => write!(f, "{}#no-schedule", self.upstream),
        }
    }
}

/// Timing record of one executed plan item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLogItem {
    pub project: ProjectKey,
    pub execution_id: String,
    pub goal: String,
    pub phase: Option<String>,
    /// Start, relative to the start of the build.
    pub started: Duration,
    pub duration: Duration,
    pub waits: Vec<WaitEdge>,
}

impl BuildLogItem {
    /// End, relative to the start of the build.
    pub fn ended(&self) -> Duration {
        self.started + self.duration
    }
}

impl fmt::Display for BuildLogItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}:{} [{}] {}..{} ms",
            self.project,
            self.goal,
            self.execution_id,
            self.phase.as_deref().unwrap_or("-"),
            self.started.as_millis(),
            self.ended().as_millis()
        )?;
        if !self.waits.is_empty() {
            let waits: Vec<String> = self.waits.iter().map(ToString::to_string).collect();
            write!(f, " waited on {}", waits.join(", "))?;
        }
        Ok(())
    }
}
