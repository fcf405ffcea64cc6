// src/plan/mod.rs

//! Task segments and per-project execution plans.

pub mod calculator;
pub mod execution_plan;
pub mod item;
pub mod segment;

pub use calculator::{ConfigPlanCalculator, LIFECYCLE_GOAL, PlanCalculator};
pub use execution_plan::ExecutionPlan;
pub use item::{ExecutionPlanItem, MojoExecution};
pub use segment::{ResolvedGoal, Task, TaskLookup, TaskSegment, calculate_task_segments};
