#![allow(dead_code)]

use std::sync::Arc;

use reactor::config::{ExecutionConfig, GoalConfig, ProjectConfig, RawReactorConfig, ReactorConfig};
use reactor::dag::{DependencyGraph, Project, ProjectKey};
use reactor::types::ReactorFailureBehaviour;

/// Phases used by test configs unless overridden.
pub const TEST_PHASES: [&str; 4] = ["validate", "compile", "test", "package"];

/// Builder for `ReactorConfig` to simplify test setup.
pub struct ReactorConfigBuilder {
    config: RawReactorConfig,
}

impl ReactorConfigBuilder {
    pub fn new() -> Self {
        let mut config = RawReactorConfig::default();
        config.lifecycle.phases = TEST_PHASES.iter().map(|s| s.to_string()).collect();
        Self { config }
    }

    pub fn with_phases(mut self, phases: &[&str]) -> Self {
        self.config.lifecycle.phases = phases.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_project(mut self, key: &str, project: ProjectConfig) -> Self {
        self.config.project.insert(key.to_string(), project);
        self
    }

    pub fn with_default_execution(mut self, phase: &str, cmd: &str) -> Self {
        self.config.default.execution.push(ExecutionConfig {
            phase: phase.to_string(),
            id: None,
            cmd: cmd.to_string(),
        });
        self
    }

    pub fn with_goal(mut self, prefix: &str, goal: &str, config: GoalConfig) -> Self {
        self.config
            .plugin
            .entry(prefix.to_string())
            .or_default()
            .goal
            .insert(goal.to_string(), config);
        self
    }

    pub fn with_root(mut self, root: &str) -> Self {
        self.config.reactor.root = Some(root.to_string());
        self
    }

    pub fn with_threads(mut self, threads: &str) -> Self {
        self.config.reactor.threads = Some(threads.to_string());
        self
    }

    pub fn with_failure_behaviour(mut self, behaviour: ReactorFailureBehaviour) -> Self {
        self.config.reactor.failure_behaviour = behaviour;
        self
    }

    pub fn with_default_goal(mut self, goal: &str) -> Self {
        self.config.reactor.default_goal = Some(goal.to_string());
        self
    }

    pub fn build_raw(self) -> RawReactorConfig {
        self.config
    }

    pub fn build(self) -> ReactorConfig {
        ReactorConfig::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ReactorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ProjectConfig`.
pub struct ProjectConfigBuilder {
    project: ProjectConfig,
}

impl ProjectConfigBuilder {
    pub fn new() -> Self {
        Self {
            project: ProjectConfig::default(),
        }
    }

    pub fn depends_on(mut self, dep: &str) -> Self {
        self.project.depends_on.push(dep.to_string());
        self
    }

    pub fn dir(mut self, dir: &str) -> Self {
        self.project.dir = Some(dir.to_string());
        self
    }

    pub fn execution(mut self, phase: &str, cmd: &str) -> Self {
        self.project.execution.push(ExecutionConfig {
            phase: phase.to_string(),
            id: None,
            cmd: cmd.to_string(),
        });
        self
    }

    pub fn execution_with_id(mut self, phase: &str, id: &str, cmd: &str) -> Self {
        self.project.execution.push(ExecutionConfig {
            phase: phase.to_string(),
            id: Some(id.to_string()),
            cmd: cmd.to_string(),
        });
        self
    }

    pub fn build(self) -> ProjectConfig {
        self.project
    }
}

impl Default for ProjectConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Goal config with just a command.
pub fn goal(cmd: &str) -> GoalConfig {
    GoalConfig {
        cmd: cmd.to_string(),
        aggregator: false,
        fork_phase: None,
        phase: None,
    }
}

/// Aggregator goal config with just a command.
pub fn aggregator_goal(cmd: &str) -> GoalConfig {
    GoalConfig {
        aggregator: true,
        ..goal(cmd)
    }
}

/// Config where each `(key, deps)` project has one `compile` execution.
pub fn compile_config(projects: &[(&str, &[&str])]) -> ReactorConfigBuilder {
    projects
        .iter()
        .fold(ReactorConfigBuilder::new(), |builder, (key, deps)| {
            let project = deps
                .iter()
                .fold(ProjectConfigBuilder::new(), |p, dep| p.depends_on(dep))
                .execution("compile", &format!("compile {key}"))
                .build();
            builder.with_project(key, project)
        })
}

/// Dependency graph over `(key, deps)` pairs.
pub fn graph(projects: &[(&str, &[&str])]) -> Arc<DependencyGraph> {
    let graph = DependencyGraph::new(projects.iter().map(|(key, deps)| {
        (
            Project::new(*key),
            deps.iter().map(|d| ProjectKey::new(d)).collect(),
        )
    }))
    .expect("valid test graph");
    Arc::new(graph)
}
