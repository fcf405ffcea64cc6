// src/engine/context.rs

use std::sync::Arc;
use std::time::Instant;

use crate::dag::DependencyGraph;
use crate::engine::events::EventCatapult;
use crate::engine::result::BuildResult;
use crate::engine::status::ReactorBuildStatus;
use crate::exec::MojoExecutor;
use crate::plan::PlanCalculator;
use crate::types::ReactorFailureBehaviour;

/// Everything a worker needs to build a project, shared by all workers of
/// one build.
pub struct ReactorContext {
    pub graph: Arc<DependencyGraph>,
    pub status: Arc<ReactorBuildStatus>,
    pub result: Arc<BuildResult>,
    pub events: Arc<EventCatapult>,
    pub calculator: Arc<dyn PlanCalculator>,
    pub executor: Arc<dyn MojoExecutor>,
    pub failure_behaviour: ReactorFailureBehaviour,
    /// Reference point for build-log offsets.
    pub build_start: Instant,
}

impl std::fmt::Debug for ReactorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactorContext")
            .field("projects", &self.graph.len())
            .field("status", &self.status)
            .field("failure_behaviour", &self.failure_behaviour)
            .finish_non_exhaustive()
    }
}
