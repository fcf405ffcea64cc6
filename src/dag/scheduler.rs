// src/dag/scheduler.rs

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::dag::graph::DependencyGraph;
use crate::dag::project::{Project, ProjectKey};
use crate::errors::Result;

/// Tracks which projects of one segment have finished and works out what
/// becomes buildable as a result.
///
/// Only projects that belong to the segment take part: upstream projects
/// outside the segment are treated as already satisfied. Every mutation goes
/// through [`ConcurrencyDependencyGraph::mark_finished`], which is serialized
/// by an internal mutex because workers finish projects concurrently.
#[derive(Debug)]
pub struct ConcurrencyDependencyGraph {
    graph: Arc<DependencyGraph>,
    /// Projects of this segment, in build order.
    projects: Vec<Arc<Project>>,
    members: HashSet<ProjectKey>,
    finished: Mutex<HashSet<ProjectKey>>,
}

impl ConcurrencyDependencyGraph {
    pub fn new(graph: Arc<DependencyGraph>, projects: Vec<Arc<Project>>) -> Self {
        let members = projects.iter().map(|p| p.key().clone()).collect();
        Self {
            graph,
            projects,
            members,
            finished: Mutex::new(HashSet::new()),
        }
    }

    /// Projects of the segment with no upstream dependency inside the segment.
    ///
    /// These are the only entry points into parallel work for the segment.
    pub fn root_schedulable(&self) -> Result<Vec<Arc<Project>>> {
        let mut roots = Vec::new();
        for project in &self.projects {
            let upstream = self.graph.upstream_projects(project.key().as_str(), false)?;
            if !upstream.iter().any(|u| self.members.contains(u.key())) {
                roots.push(Arc::clone(project));
            }
        }
        Ok(roots)
    }

    /// Record `key` as finished and return the projects that became
    /// schedulable because of it.
    ///
    /// A downstream project is returned only once *all* of its upstream
    /// projects in the segment have finished. Across the whole segment each
    /// project is returned by at most one call.
    pub fn mark_finished(&self, key: &ProjectKey) -> Result<Vec<Arc<Project>>> {
        let mut finished = self.finished.lock().unwrap_or_else(|e| e.into_inner());

        if !finished.insert(key.clone()) {
            warn!(project = %key, "project marked finished twice; ignoring");
            return Ok(Vec::new());
        }

        let mut newly_schedulable = Vec::new();
        for dependent in self.graph.downstream_projects(key.as_str(), false)? {
            if !self.members.contains(dependent.key()) {
                continue;
            }
            let upstream = self
                .graph
                .upstream_projects(dependent.key().as_str(), false)?;
            let ready = upstream
                .iter()
                .filter(|u| self.members.contains(u.key()))
                .all(|u| finished.contains(u.key()));
            if ready {
                debug!(
                    project = %dependent.key(),
                    unblocked_by = %key,
                    "all upstream projects finished; schedulable"
                );
                newly_schedulable.push(dependent);
            }
        }

        Ok(newly_schedulable)
    }

    pub fn is_finished(&self, key: &str) -> bool {
        let finished = self.finished.lock().unwrap_or_else(|e| e.into_inner());
        finished.contains(key)
    }

    pub fn finished_count(&self) -> usize {
        let finished = self.finished.lock().unwrap_or_else(|e| e.into_inner());
        finished.len()
    }

    /// Projects of the segment, in build order.
    pub fn projects(&self) -> &[Arc<Project>] {
        &self.projects
    }
}
