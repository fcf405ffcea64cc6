// src/engine/status.rs

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};

use crate::dag::{DependencyGraph, ProjectKey};

/// Shared build-wide stop flag.
///
/// Cloned into whatever may request a stop (Ctrl-C handler, the reactor
/// itself). Once set it stays set.
#[derive(Debug, Clone, Default)]
pub struct HaltHandle(Arc<AtomicBool>);

impl HaltHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn halt(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_halted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Mutable status of one build: the halt flag and the blacklist.
///
/// Both only ever grow. Blacklisting a project inserts its whole downstream
/// closure under a single lock, so no reader can observe the project banned
/// while one of its dependents is still eligible.
#[derive(Debug)]
pub struct ReactorBuildStatus {
    graph: Arc<DependencyGraph>,
    halted: HaltHandle,
    blacklisted: Mutex<HashSet<ProjectKey>>,
}

impl ReactorBuildStatus {
    pub fn new(graph: Arc<DependencyGraph>) -> Self {
        Self::with_halt_handle(graph, HaltHandle::new())
    }

    /// Status whose halt flag is shared with `halted`.
    pub fn with_halt_handle(graph: Arc<DependencyGraph>, halted: HaltHandle) -> Self {
        Self {
            graph,
            halted,
            blacklisted: Mutex::new(HashSet::new()),
        }
    }

    /// Ban `key` and every project transitively downstream of it.
    ///
    /// Idempotent; never fails. A key unknown to the graph is banned on its
    /// own and halts the build.
    pub fn blacklist(&self, key: &ProjectKey) {
        if self.is_blacklisted(key.as_str()) {
            return;
        }

        let downstream = match self.graph.downstream_projects(key.as_str(), true) {
            Ok(projects) => projects,
            Err(err) => {
                // Without the closure a dependent could still start.
                error!(project = %key, error = %err, "cannot resolve downstream projects to blacklist; halting");
                self.halt();
                Vec::new()
            }
        };

        let mut blacklisted = self.blacklisted.lock().unwrap_or_else(|e| e.into_inner());
        if !blacklisted.insert(key.clone()) {
            return;
        }
        for project in &downstream {
            blacklisted.insert(project.key().clone());
        }
        drop(blacklisted);

        if downstream.is_empty() {
            warn!(project = %key, "project blacklisted");
        } else {
            let names: Vec<&str> = downstream.iter().map(|p| p.key().as_str()).collect();
            warn!(project = %key, downstream = ?names, "project blacklisted with downstream projects");
        }
    }

    pub fn halt(&self) {
        if !self.halted.is_halted() {
            info!("build halted; no further projects will be started");
        }
        self.halted.halt();
    }

    pub fn is_halted(&self) -> bool {
        self.halted.is_halted()
    }

    pub fn is_blacklisted(&self, key: &str) -> bool {
        let blacklisted = self.blacklisted.lock().unwrap_or_else(|e| e.into_inner());
        blacklisted.contains(key)
    }

    /// Checked before a project starts and between its plan items.
    pub fn is_halted_or_blacklisted(&self, key: &str) -> bool {
        self.is_halted() || self.is_blacklisted(key)
    }

    /// Snapshot of the blacklist, sorted.
    pub fn blacklisted(&self) -> Vec<ProjectKey> {
        let blacklisted = self.blacklisted.lock().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<ProjectKey> = blacklisted.iter().cloned().collect();
        keys.sort();
        keys
    }
}
