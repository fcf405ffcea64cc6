// src/exec/mod.rs

//! Mojo execution.
//!
//! - `backend.rs`: the `MojoExecutor` trait and the process-backed executor.
//! - `task_runner.rs`: runs a single execution as a shell process.

pub mod backend;
pub mod task_runner;

pub use backend::{MojoExecutor, MojoFuture, ProcessMojoExecutor};
