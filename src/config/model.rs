// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::ReactorFailureBehaviour;

/// Build descriptor as read from a TOML file, before validation.
///
/// ```toml
/// [reactor]
/// threads = "2C"
/// failure_behaviour = "fail-at-end"
///
/// [lifecycle]
/// phases = ["validate", "compile", "test", "package", "install"]
///
/// [project."com.example:api"]
/// [[project."com.example:api".execution]]
/// phase = "compile"
/// cmd = "make -C api"
///
/// [project."com.example:core"]
/// depends_on = ["com.example:api"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReactorConfig {
    #[serde(default)]
    pub reactor: ReactorSection,

    #[serde(default)]
    pub lifecycle: LifecycleSection,

    /// Executions inherited by every project.
    #[serde(default)]
    pub default: DefaultSection,

    /// Goals invocable as `prefix:goal`, keyed by plugin prefix.
    #[serde(default)]
    pub plugin: BTreeMap<String, PluginConfig>,

    /// All projects from `[project."<group:artifact>"]`.
    #[serde(default)]
    pub project: BTreeMap<String, ProjectConfig>,
}

/// Validated build descriptor.
///
/// Only obtainable through `TryFrom<RawReactorConfig>` (see `validate.rs`),
/// so holders can rely on the project graph being acyclic and every
/// reference resolving.
#[derive(Debug, Clone)]
pub struct ReactorConfig {
    pub reactor: ReactorSection,
    pub lifecycle: LifecycleSection,
    pub default: DefaultSection,
    pub plugin: BTreeMap<String, PluginConfig>,
    pub project: BTreeMap<String, ProjectConfig>,
}

impl ReactorConfig {
    pub(crate) fn new_unchecked(raw: RawReactorConfig) -> Self {
        Self {
            reactor: raw.reactor,
            lifecycle: raw.lifecycle,
            default: raw.default,
            plugin: raw.plugin,
            project: raw.project,
        }
    }
}

/// `[reactor]` section: how the build is scheduled.
#[derive(Debug, Clone, Deserialize)]
pub struct ReactorSection {
    /// Project that aggregator goals run against.
    ///
    /// Defaults to the first project in build order.
    #[serde(default)]
    pub root: Option<String>,

    /// Goal or phase used when none is given on the command line.
    #[serde(default)]
    pub default_goal: Option<String>,

    /// Thread-count expression: `"4"`, `"1.5C"`. Absent means a
    /// single-threaded build.
    #[serde(default)]
    pub threads: Option<String>,

    /// Multiply `threads` by the number of cores.
    #[serde(default)]
    pub per_core: bool,

    #[serde(default)]
    pub failure_behaviour: ReactorFailureBehaviour,

    /// Interleave projects phase by phase instead of project by project.
    #[serde(default)]
    pub weave: bool,

    /// How long to wait for stray workers when the pool shuts down.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

fn default_shutdown_grace_ms() -> u64 {
    5000
}

impl Default for ReactorSection {
    fn default() -> Self {
        Self {
            root: None,
            default_goal: None,
            threads: None,
            per_core: false,
            failure_behaviour: ReactorFailureBehaviour::default(),
            weave: false,
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

/// `[lifecycle]` section: the ordered phases of the build lifecycle.
#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleSection {
    #[serde(default = "default_phases")]
    pub phases: Vec<String>,
}

fn default_phases() -> Vec<String> {
    [
        "validate", "compile", "test", "package", "verify", "install", "deploy",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for LifecycleSection {
    fn default() -> Self {
        Self {
            phases: default_phases(),
        }
    }
}

/// `[default]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefaultSection {
    /// Executions bound for every project, ahead of the project's own.
    #[serde(default)]
    pub execution: Vec<ExecutionConfig>,
}

/// `[plugin.<prefix>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginConfig {
    #[serde(default)]
    pub goal: BTreeMap<String, GoalConfig>,
}

/// `[plugin.<prefix>.goal.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct GoalConfig {
    pub cmd: String,

    /// Run once against the root project rather than once per project.
    #[serde(default)]
    pub aggregator: bool,

    /// Lifecycle phase to run (forked) before the goal itself.
    #[serde(default)]
    pub fork_phase: Option<String>,

    /// Phase the goal reports while running, used for weave ordering.
    #[serde(default)]
    pub phase: Option<String>,
}

/// `[project."<key>"]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectConfig {
    /// Working directory for the project's commands.
    #[serde(default)]
    pub dir: Option<String>,

    /// Projects that must finish before this one starts.
    #[serde(default)]
    pub depends_on: Vec<String>,

    #[serde(default)]
    pub execution: Vec<ExecutionConfig>,
}

/// One command bound to a lifecycle phase.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    pub phase: String,

    /// Execution id; defaults to `<phase>-<n>`.
    #[serde(default)]
    pub id: Option<String>,

    pub cmd: String,
}
