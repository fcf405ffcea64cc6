// src/engine/mod.rs

//! Reactor engine.
//!
//! This module ties together:
//! - the shared build status and result (`status`, `result`)
//! - the worker pool and its sizing (`pool`)
//! - per-project plan execution (`builder`)
//! - the three scheduling strategies: single-threaded (in `reactor`),
//!   wavefront (`threaded`) and phase-interleaved (`weave`)
//! - the top-level driver, [`LifecycleStarter`]
//!
//! Build events flow out through [`EventSink`]s; nothing in here writes to
//! stdout.

pub mod build_log;
pub mod builder;
pub mod context;
pub mod events;
pub mod pool;
pub mod reactor;
pub mod result;
pub mod status;
pub mod threaded;
pub mod weave;

pub use build_log::{BuildLogItem, WaitEdge, WaitTarget};
pub use builder::{LifecycleModuleBuilder, ProjectBuildOutcome};
pub use context::ReactorContext;
pub use events::{EventCatapult, EventSink, ExecutionEvent, TracingEventSink};
pub use pool::{ThreadPoolSizer, WorkerCount, WorkerPool};
pub use reactor::{BuildRequest, BuildSession, LifecycleStarter};
pub use result::{BuildResult, BuildSummary, ProjectOutcome, SkipReason};
pub use status::{HaltHandle, ReactorBuildStatus};
pub use weave::WeaveGate;
