// src/dag/mod.rs

//! Project dependency graph and wavefront scheduling.
//!
//! - [`project`] holds the project identity types.
//! - [`graph`] is the read-only dependency graph view (upstream/downstream
//!   lookups and build order).
//! - [`scheduler`] tracks finished projects within one segment and computes
//!   which projects become schedulable.

pub mod graph;
pub mod project;
pub mod scheduler;

pub use graph::{DependencyGraph, STANDALONE_PROJECT};
pub use project::{Project, ProjectKey};
pub use scheduler::ConcurrencyDependencyGraph;
