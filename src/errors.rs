// src/errors.rs

//! Crate-wide error types.
//!
//! - [`ReactorError`] covers setup and precondition failures. These are the
//!   only errors that propagate out of a build invocation.
//! - [`MojoError`] is what a single execution reports back.
//! - [`BuildFailure`] is the per-project failure recorded in the build
//!   result; it never crosses a project boundary as an `Err`.

use thiserror::Error;

use crate::dag::ProjectKey;

#[derive(Error, Debug)]
pub enum ReactorError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Project not found in dependency graph: {0}")]
    ProjectNotInGraph(ProjectKey),

    #[error("Cycle detected in project graph: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("No goals have been specified for this build and no default goal is configured")]
    NoGoalsSpecified,

    #[error("The goal(s) {0} require a project to execute but the reactor is empty")]
    ProjectRequired(String),

    #[error("{0}")]
    UnknownTask(String),
}

/// Failure reported by a single mojo execution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MojoError {
    /// The execution ran and failed. Handled per the reactor failure behaviour.
    #[error("{0}")]
    Failed(String),

    /// The execution could not be carried out at all; halts the build.
    #[error("fatal: {0}")]
    Fatal(String),
}

/// Failure reported by the execution-plan calculator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("unknown lifecycle phase \"{0}\"")]
    UnknownPhase(String),

    #[error("no goal \"{goal}\" in plugin \"{prefix}\"")]
    UnknownGoal { prefix: String, goal: String },

    #[error("{0}")]
    Other(String),
}

/// Why a project failed, as recorded in the build result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildFailure {
    #[error("could not calculate execution plan: {0}")]
    PlanCalculation(#[from] PlanError),

    #[error("execution {execution} failed: {source}")]
    Mojo { execution: String, source: MojoError },

    #[error("worker terminated abnormally: {0}")]
    Worker(String),
}

impl BuildFailure {
    /// Fatal failures halt the whole build regardless of failure behaviour.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BuildFailure::Mojo {
                source: MojoError::Fatal(_),
                ..
            } | BuildFailure::Worker(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ReactorError>;
