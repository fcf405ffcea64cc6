// src/exec/backend.rs

//! Pluggable mojo executor abstraction.
//!
//! The builder talks to a `MojoExecutor` rather than spawning processes
//! itself, so tests can swap in a scripted executor.
//!
//! - `ProcessMojoExecutor` is the production implementation: it runs each
//!   execution's command through the platform shell (see [`task_runner`]).
//! - Tests provide their own `MojoExecutor` that records timings and fails
//!   on demand.
//!
//! [`task_runner`]: super::task_runner

use std::future::Future;
use std::pin::Pin;

use crate::dag::Project;
use crate::errors::MojoError;
use crate::plan::MojoExecution;

use super::task_runner::run_execution;

/// Boxed future returned by [`MojoExecutor::execute`].
pub type MojoFuture<'a> = Pin<Box<dyn Future<Output = Result<(), MojoError>> + Send + 'a>>;

/// Runs one resolved execution.
///
/// The reactor does not interpret why an execution failed, only whether it
/// returned `Failed` (handled per failure behaviour) or `Fatal` (halts).
pub trait MojoExecutor: Send + Sync {
    /// Execute `execution` for `project`.
    ///
    /// `phase` is the lifecycle phase the builder is running the item in.
    fn execute<'a>(
        &'a self,
        project: &'a Project,
        execution: &'a MojoExecution,
        phase: Option<&'a str>,
    ) -> MojoFuture<'a>;
}

/// Executor that runs each execution's `cmd` as a shell command.
#[derive(Debug, Clone, Default)]
pub struct ProcessMojoExecutor;

impl ProcessMojoExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl MojoExecutor for ProcessMojoExecutor {
    fn execute<'a>(
        &'a self,
        project: &'a Project,
        execution: &'a MojoExecution,
        phase: Option<&'a str>,
    ) -> MojoFuture<'a> {
        Box::pin(run_execution(project, execution, phase))
    }
}
