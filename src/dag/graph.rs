// src/dag/graph.rs

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};

use crate::config::model::ReactorConfig;
use crate::dag::project::{Project, ProjectKey};
use crate::errors::{ReactorError, Result};

/// Key of the synthetic project used when aggregator goals run without any
/// declared project.
pub const STANDALONE_PROJECT: &str = "reactor:standalone";

/// Read-only view over the project dependency graph.
///
/// Edge direction is `upstream -> downstream`: for "core depends on api"
/// there is an edge `api -> core`. The graph is built once per build and
/// never mutated, so it is safe to share behind an `Arc` without locking.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<Arc<Project>, ()>,
    index: HashMap<ProjectKey, NodeIndex>,
    /// Projects in a dependency-respecting build order.
    sorted: Vec<Arc<Project>>,
    /// Position of each node in `sorted`.
    position: HashMap<NodeIndex, usize>,
}

impl DependencyGraph {
    /// Build a graph from projects and their direct dependencies.
    ///
    /// Fails if a dependency names an unknown project or the graph has a cycle.
    pub fn new<I>(projects: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Project, Vec<ProjectKey>)>,
    {
        let mut graph: DiGraph<Arc<Project>, ()> = DiGraph::new();
        let mut index = HashMap::new();
        let mut deps = Vec::new();

        // First pass: nodes.
        for (project, depends_on) in projects {
            let key = project.key().clone();
            let idx = graph.add_node(Arc::new(project));
            index.insert(key.clone(), idx);
            deps.push((key, depends_on));
        }

        // Second pass: edges upstream -> downstream.
        for (key, depends_on) in deps {
            let downstream = index[&key];
            for dep in depends_on {
                let upstream = *index
                    .get(&dep)
                    .ok_or_else(|| ReactorError::ProjectNotInGraph(dep.clone()))?;
                graph.update_edge(upstream, downstream, ());
            }
        }

        let order = stable_toposort(&graph)?;

        let position = order.iter().enumerate().map(|(i, idx)| (*idx, i)).collect();
        let sorted = order.iter().map(|idx| Arc::clone(&graph[*idx])).collect();

        Ok(Self {
            graph,
            index,
            sorted,
            position,
        })
    }

    /// Build the graph described by a validated [`ReactorConfig`].
    ///
    /// Projects are declared in key order, which is also the tie-break
    /// between independent projects.
    pub fn from_config(cfg: &ReactorConfig) -> Result<Self> {
        Self::new(cfg.project.iter().map(|(key, pc)| {
            let mut project = Project::new(key.as_str());
            if let Some(dir) = &pc.dir {
                project = project.with_dir(dir);
            }
            let deps = pc.depends_on.iter().map(ProjectKey::new).collect();
            (project, deps)
        }))
    }

    /// A graph holding only the synthetic standalone project.
    pub fn standalone() -> Self {
        let mut graph = DiGraph::new();
        let project = Arc::new(Project::new(STANDALONE_PROJECT));
        let idx = graph.add_node(Arc::clone(&project));
        Self {
            graph,
            index: HashMap::from([(project.key().clone(), idx)]),
            sorted: vec![project],
            position: HashMap::from([(idx, 0)]),
        }
    }

    /// All projects, in build order.
    pub fn projects(&self) -> &[Arc<Project>] {
        &self.sorted
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn project(&self, key: &str) -> Result<&Arc<Project>> {
        let idx = self.node(key)?;
        Ok(&self.graph[idx])
    }

    /// Projects `key` depends on, directly or (if `transitive`) indirectly.
    pub fn upstream_projects(&self, key: &str, transitive: bool) -> Result<Vec<Arc<Project>>> {
        let idx = self.node(key)?;
        let nodes: Vec<NodeIndex> = if transitive {
            let reversed = Reversed(&self.graph);
            let mut dfs = Dfs::new(reversed, idx);
            let mut found = Vec::new();
            while let Some(nx) = dfs.next(reversed) {
                if nx != idx {
                    found.push(nx);
                }
            }
            found
        } else {
            self.graph
                .neighbors_directed(idx, Direction::Incoming)
                .collect()
        };
        Ok(self.in_build_order(nodes))
    }

    /// Projects depending on `key`, directly or (if `transitive`) indirectly.
    pub fn downstream_projects(&self, key: &str, transitive: bool) -> Result<Vec<Arc<Project>>> {
        let idx = self.node(key)?;
        let nodes: Vec<NodeIndex> = if transitive {
            let mut dfs = Dfs::new(&self.graph, idx);
            let mut found = Vec::new();
            while let Some(nx) = dfs.next(&self.graph) {
                if nx != idx {
                    found.push(nx);
                }
            }
            found
        } else {
            self.graph
                .neighbors_directed(idx, Direction::Outgoing)
                .collect()
        };
        Ok(self.in_build_order(nodes))
    }

    fn node(&self, key: &str) -> Result<NodeIndex> {
        self.index
            .get(key)
            .copied()
            .ok_or_else(|| ReactorError::ProjectNotInGraph(ProjectKey::new(key)))
    }

    fn in_build_order(&self, mut nodes: Vec<NodeIndex>) -> Vec<Arc<Project>> {
        nodes.sort_by_key(|idx| self.position[idx]);
        nodes.dedup();
        nodes
            .into_iter()
            .map(|idx| Arc::clone(&self.graph[idx]))
            .collect()
    }
}

/// Kahn's algorithm, always taking the earliest-declared ready project.
///
/// Node indices follow declaration order, so independent projects keep the
/// order they were declared in.
fn stable_toposort(graph: &DiGraph<Arc<Project>, ()>) -> Result<Vec<NodeIndex>> {
    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|idx| graph.neighbors_directed(idx, Direction::Incoming).count())
        .collect();

    let mut ready: BinaryHeap<Reverse<NodeIndex>> = graph
        .node_indices()
        .filter(|idx| in_degree[idx.index()] == 0)
        .map(Reverse)
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(Reverse(idx)) = ready.pop() {
        order.push(idx);
        for next in graph.neighbors_directed(idx, Direction::Outgoing) {
            let remaining = &mut in_degree[next.index()];
            *remaining -= 1;
            if *remaining == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    if order.len() < graph.node_count() {
        let stuck = graph
            .node_indices()
            .find(|idx| in_degree[idx.index()] > 0)
            .map(|idx| graph[idx].key().to_string())
            .unwrap_or_default();
        return Err(ReactorError::DagCycle(format!(
            "cycle detected in project graph involving '{stuck}'"
        )));
    }
    Ok(order)
}
