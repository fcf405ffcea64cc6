// src/engine/weave.rs

//! Phase-interleaved ("weave") building.
//!
//! Every project of a segment starts at once. Before each plan item, a
//! project waits for its immediate upstream projects to get past the same
//! phase, instead of waiting for them to finish completely. Worker permits
//! are only held while an item executes, so waiting projects never starve
//! the ones they wait on.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::dag::{DependencyGraph, Project, ProjectKey};
use crate::engine::build_log::{WaitEdge, WaitTarget};
use crate::engine::builder::{LifecycleModuleBuilder, ProjectBuildOutcome};
use crate::engine::pool::WorkerPool;
use crate::errors::{BuildFailure, Result};
use crate::plan::{ExecutionPlan, ExecutionPlanItem, TaskSegment};

/// Result of waiting for an item's turn.
#[derive(Debug)]
pub struct ItemAdmission {
    pub waits: Vec<WaitEdge>,
    /// Worker slot, held until the item has executed.
    pub permit: Option<OwnedSemaphorePermit>,
}

/// Cross-project ordering for one weave segment.
#[derive(Debug)]
pub struct WeaveGate {
    plans: HashMap<ProjectKey, Arc<ExecutionPlan>>,
    /// Immediate upstream projects that have a plan in this segment.
    upstream: HashMap<ProjectKey, Vec<ProjectKey>>,
    permits: Option<Arc<Semaphore>>,
}

impl WeaveGate {
    pub fn new(
        graph: &DependencyGraph,
        plans: HashMap<ProjectKey, Arc<ExecutionPlan>>,
        permits: Option<Arc<Semaphore>>,
    ) -> Result<Self> {
        let mut upstream = HashMap::new();
        for key in plans.keys() {
            let deps: Vec<ProjectKey> = graph
                .upstream_projects(key.as_str(), false)?
                .iter()
                .map(|p| p.key().clone())
                .filter(|k| plans.contains_key(k))
                .collect();
            upstream.insert(key.clone(), deps);
        }
        Ok(Self {
            plans,
            upstream,
            permits,
        })
    }

    pub fn plan(&self, key: &str) -> Option<&Arc<ExecutionPlan>> {
        self.plans.get(key)
    }

    /// Wait until `item` of `project` may run, then take a worker slot.
    ///
    /// For each immediate upstream project:
    /// - if it runs the item's phase and has an item bound to it, wait for
    ///   its last such item;
    /// - if it runs the phase with nothing bound to it, there is nothing to
    ///   wait for;
    /// - if it does not run the phase, or the item has no phase, wait for
    ///   its whole plan.
    pub async fn admit(&self, project: &Project, item: &ExecutionPlanItem) -> ItemAdmission {
        let mut waits = Vec::new();
        let deps = self
            .upstream
            .get(project.key().as_str())
            .map(Vec::as_slice)
            .unwrap_or_default();

        for upstream in deps {
            let Some(plan) = self.plans.get(upstream) else {
                continue;
            };
            let started = Instant::now();
            let target = match item.phase() {
                Some(phase) if plan.contains_phase(phase) => match plan.find_last_in_phase(phase) {
                    Some(upstream_item) => {
                        upstream_item.wait_until_done().await;
                        WaitTarget::Item {
                            execution_id: upstream_item.execution().execution_id.clone(),
                        }
                    }
                    None => WaitTarget::NotScheduled,
                },
                _ => {
                    plan.wait_until_all_done().await;
                    WaitTarget::WholePlan
                }
            };
            let waited = match target {
                WaitTarget::NotScheduled => Duration::ZERO,
                _ => started.elapsed(),
            };
            debug!(
                project = %project.key(),
                upstream = %upstream,
                phase = item.phase().unwrap_or("-"),
                waited_ms = waited.as_millis() as u64,
                "weave dependency satisfied"
            );
            waits.push(WaitEdge {
                upstream: upstream.clone(),
                target,
                waited,
            });
        }

        let permit = match &self.permits {
            Some(sem) => Arc::clone(sem).acquire_owned().await.ok(),
            None => None,
        };

        ItemAdmission { waits, permit }
    }
}

/// Build one segment with every project interleaved phase by phase.
///
/// Plans are calculated up front, in build order; a project whose plan
/// cannot be calculated is failed before anything starts.
pub async fn build_segment(
    builder: &LifecycleModuleBuilder,
    pool: &mut WorkerPool<Arc<Project>, ProjectBuildOutcome>,
    segment_index: usize,
    segment: &TaskSegment,
    projects: &[Arc<Project>],
) -> Result<()> {
    let ctx = builder.context();
    let segment = Arc::new(segment.clone());

    let mut plans = HashMap::new();
    let mut ordered = Vec::new();
    for project in projects {
        if builder.ineligibility(project).is_some() {
            continue;
        }
        if let Some(plan) = builder
            .calculate_plan_isolated(segment_index, &segment, project)
            .await
        {
            let plan = Arc::new(plan);
            plans.insert(project.key().clone(), Arc::clone(&plan));
            ordered.push(plan);
        }
    }

    let gate = Arc::new(WeaveGate::new(&ctx.graph, plans, pool.permits())?);
    info!(
        segment = segment_index,
        projects = ordered.len(),
        "starting weave segment"
    );

    for plan in ordered {
        let builder = builder.clone();
        let gate = Arc::clone(&gate);
        let project = Arc::clone(plan.project());
        pool.submit_unthrottled(project, async move {
            builder
                .build_project(segment_index, &plan, Some(&gate))
                .await
        });
    }

    while let Some((project, outcome)) = pool.next_completed().await {
        if let Err(panic) = outcome {
            warn!(project = %project.key(), "weave worker terminated abnormally");
            builder.handle_build_error(
                segment_index,
                &project,
                BuildFailure::Worker(panic),
                Duration::ZERO,
            );
            if let Some(plan) = gate.plan(project.key().as_str()) {
                plan.force_all_complete();
            }
        }
    }

    Ok(())
}
