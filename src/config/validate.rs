// src/config/validate.rs

use std::collections::HashSet;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{RawReactorConfig, ReactorConfig};
use crate::errors::{ReactorError, Result};

impl TryFrom<RawReactorConfig> for ReactorConfig {
    type Error = ReactorError;

    fn try_from(raw: RawReactorConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ReactorConfig::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawReactorConfig) -> Result<()> {
    validate_lifecycle(cfg)?;
    validate_reactor_section(cfg)?;
    validate_project_dependencies(cfg)?;
    validate_execution_phases(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn validate_lifecycle(cfg: &RawReactorConfig) -> Result<()> {
    if cfg.lifecycle.phases.is_empty() {
        return Err(ReactorError::ConfigError(
            "[lifecycle].phases must list at least one phase".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for phase in &cfg.lifecycle.phases {
        if phase.contains(':') {
            return Err(ReactorError::ConfigError(format!(
                "lifecycle phase '{phase}' must not contain ':'"
            )));
        }
        if !seen.insert(phase.as_str()) {
            return Err(ReactorError::ConfigError(format!(
                "lifecycle phase '{phase}' is declared twice"
            )));
        }
    }
    Ok(())
}

fn validate_reactor_section(cfg: &RawReactorConfig) -> Result<()> {
    // failure_behaviour is strongly typed and rejected during deserialization.

    if let Some(root) = &cfg.reactor.root {
        if !cfg.project.contains_key(root) {
            return Err(ReactorError::ConfigError(format!(
                "[reactor].root '{root}' is not a declared project"
            )));
        }
    }
    Ok(())
}

fn validate_project_dependencies(cfg: &RawReactorConfig) -> Result<()> {
    for (name, project) in cfg.project.iter() {
        for dep in project.depends_on.iter() {
            if dep == name {
                return Err(ReactorError::ConfigError(format!(
                    "project '{name}' cannot depend on itself in `depends_on`"
                )));
            }
            if !cfg.project.contains_key(dep) {
                return Err(ReactorError::ConfigError(format!(
                    "project '{name}' has unknown dependency '{dep}' in `depends_on`"
                )));
            }
        }
    }
    Ok(())
}

fn validate_execution_phases(cfg: &RawReactorConfig) -> Result<()> {
    let phases: HashSet<&str> = cfg.lifecycle.phases.iter().map(String::as_str).collect();

    for exec in &cfg.default.execution {
        if !phases.contains(exec.phase.as_str()) {
            return Err(ReactorError::ConfigError(format!(
                "[[default.execution]] is bound to unknown phase '{}'",
                exec.phase
            )));
        }
    }

    for (name, project) in cfg.project.iter() {
        for exec in &project.execution {
            if !phases.contains(exec.phase.as_str()) {
                return Err(ReactorError::ConfigError(format!(
                    "project '{name}' has an execution bound to unknown phase '{}'",
                    exec.phase
                )));
            }
        }
    }

    for (prefix, plugin) in cfg.plugin.iter() {
        for (goal, gc) in plugin.goal.iter() {
            if let Some(fork) = &gc.fork_phase {
                if !phases.contains(fork.as_str()) {
                    return Err(ReactorError::ConfigError(format!(
                        "goal '{prefix}:{goal}' forks unknown phase '{fork}'"
                    )));
                }
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawReactorConfig) -> Result<()> {
    // Edge direction: dependency -> dependent.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.project.keys() {
        graph.add_node(name.as_str());
    }

    for (name, project) in cfg.project.iter() {
        for dep in project.depends_on.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(ReactorError::DagCycle(format!(
            "cycle detected in project graph involving project '{}'",
            cycle.node_id()
        ))),
    }
}
