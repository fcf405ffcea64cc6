// src/engine/threaded.rs

//! Wavefront building: projects start as soon as their upstream projects
//! are done.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::dag::{ConcurrencyDependencyGraph, Project};
use crate::engine::builder::{LifecycleModuleBuilder, ProjectBuildOutcome};
use crate::engine::pool::WorkerPool;
use crate::errors::{BuildFailure, Result};
use crate::plan::TaskSegment;

/// Build one segment on the worker pool.
///
/// The root-schedulable projects are submitted first. Each completion is
/// fed to the scheduler and whatever it unblocks is submitted right away,
/// unless the build has been halted in the meantime. Returns once nothing
/// is in flight.
pub async fn build_segment(
    builder: &LifecycleModuleBuilder,
    pool: &mut WorkerPool<Arc<Project>, ProjectBuildOutcome>,
    segment_index: usize,
    segment: &Arc<TaskSegment>,
    projects: &[Arc<Project>],
) -> Result<()> {
    let ctx = builder.context();
    let scheduler = ConcurrencyDependencyGraph::new(Arc::clone(&ctx.graph), projects.to_vec());

    let roots = scheduler.root_schedulable()?;
    info!(
        segment = segment_index,
        projects = projects.len(),
        roots = roots.len(),
        "starting parallel segment"
    );

    let mut in_flight = 0usize;
    for project in roots {
        submit(builder, pool, segment_index, segment, project);
        in_flight += 1;
    }

    while in_flight > 0 {
        let Some((project, outcome)) = pool.next_completed().await else {
            warn!(
                segment = segment_index,
                in_flight, "worker pool drained with projects unaccounted for"
            );
            break;
        };
        in_flight -= 1;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(panic) => {
                builder.handle_build_error(
                    segment_index,
                    &project,
                    BuildFailure::Worker(panic),
                    Duration::ZERO,
                );
                ProjectBuildOutcome::Failed {
                    releases_downstream: false,
                }
            }
        };

        if !outcome.releases_downstream() {
            continue;
        }

        let unblocked = scheduler.mark_finished(project.key())?;
        if ctx.status.is_halted() {
            debug!(
                project = %project.key(),
                unblocked = unblocked.len(),
                "build halted; not scheduling downstream projects"
            );
            continue;
        }
        for next in unblocked {
            submit(builder, pool, segment_index, segment, next);
            in_flight += 1;
        }
    }

    debug!(
        segment = segment_index,
        finished = scheduler.finished_count(),
        "parallel segment done"
    );
    Ok(())
}

fn submit(
    builder: &LifecycleModuleBuilder,
    pool: &mut WorkerPool<Arc<Project>, ProjectBuildOutcome>,
    segment_index: usize,
    segment: &Arc<TaskSegment>,
    project: Arc<Project>,
) {
    debug!(project = %project.key(), segment = segment_index, "scheduling project");
    let builder = builder.clone();
    let segment = Arc::clone(segment);
    let label = Arc::clone(&project);
    pool.submit(label, async move {
        builder
            .build_lazily(segment_index, &segment, &project)
            .await
    });
}
