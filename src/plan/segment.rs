// src/plan/segment.rs

//! Splitting the requested goals and phases into task segments.

use std::fmt;

use tracing::debug;

use crate::errors::{ReactorError, Result};
use crate::plan::calculator::PlanCalculator;

/// Execution id given to goals invoked directly from the command line.
pub const DEFAULT_CLI_EXECUTION_ID: &str = "default-cli";

/// A plugin goal resolved from a `prefix:goal[@id]` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGoal {
    pub prefix: String,
    pub goal: String,
    pub execution_id: String,
    /// Runs once against the root project.
    pub aggregator: bool,
}

impl fmt::Display for ResolvedGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.prefix, self.goal)?;
        if self.execution_id != DEFAULT_CLI_EXECUTION_ID {
            write!(f, "@{}", self.execution_id)?;
        }
        Ok(())
    }
}

/// How a command-line token was interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskLookup {
    Goal(ResolvedGoal),
    Phase(String),
    NotFound(String),
}

/// One requested unit: a lifecycle phase or a direct goal invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Phase(String),
    Goal(ResolvedGoal),
}

impl Task {
    pub fn is_aggregating(&self) -> bool {
        match self {
            Task::Phase(_) => false,
            Task::Goal(goal) => goal.aggregator,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Phase(phase) => f.write_str(phase),
            Task::Goal(goal) => goal.fmt(f),
        }
    }
}

/// A run of tasks sharing aggregating-ness.
///
/// Aggregating segments apply to the root project only; the others apply to
/// every project in build order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSegment {
    tasks: Vec<Task>,
    aggregating: bool,
}

impl TaskSegment {
    pub fn new(aggregating: bool) -> Self {
        Self {
            tasks: Vec::new(),
            aggregating,
        }
    }

    pub fn with_tasks(aggregating: bool, tasks: Vec<Task>) -> Self {
        Self { tasks, aggregating }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn is_aggregating(&self) -> bool {
        self.aggregating
    }

    /// Non-aggregating segments need at least one real project.
    pub fn requires_project(&self) -> bool {
        !self.aggregating
    }
}

impl fmt::Display for TaskSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.tasks.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", names.join(", "))?;
        if self.aggregating {
            f.write_str(" (aggregating)")?;
        }
        Ok(())
    }
}

/// Split `tokens` into segments, in command order.
///
/// Consecutive tasks with the same aggregating-ness share a segment; a
/// change starts a new one.
pub fn calculate_task_segments(
    tokens: &[String],
    calculator: &dyn PlanCalculator,
) -> Result<Vec<TaskSegment>> {
    let mut segments: Vec<TaskSegment> = Vec::new();

    for token in tokens {
        let task = match calculator.lookup_task(token) {
            TaskLookup::Goal(goal) => Task::Goal(goal),
            TaskLookup::Phase(phase) => Task::Phase(phase),
            TaskLookup::NotFound(token) => {
                return Err(unknown_task(&token, calculator));
            }
        };

        let aggregating = task.is_aggregating();
        match segments.last_mut() {
            Some(current) if current.aggregating == aggregating => current.tasks.push(task),
            _ => {
                let mut segment = TaskSegment::new(aggregating);
                segment.tasks.push(task);
                segments.push(segment);
            }
        }
    }

    debug!(
        segments = ?segments.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "calculated task segments"
    );
    Ok(segments)
}

fn unknown_task(token: &str, calculator: &dyn PlanCalculator) -> ReactorError {
    let message = if token.contains(':') {
        format!(
            "Could not find goal \"{token}\". Goals take the form <plugin-prefix>:<goal>[@<execution-id>]."
        )
    } else {
        format!("Unknown lifecycle phase \"{token}\".")
    };
    ReactorError::UnknownTask(format!(
        "{message} Available lifecycle phases are: {}.",
        calculator.available_phases().join(", ")
    ))
}

/// Split a goal token into `(prefix, goal, execution_id)`.
///
/// Returns `None` for tokens that are not of the form `prefix:goal[@id]`.
pub fn parse_goal_spec(token: &str) -> Option<(&str, &str, &str)> {
    let (prefix, rest) = token.split_once(':')?;
    let (goal, execution_id) = match rest.split_once('@') {
        Some((goal, id)) => (goal, id),
        None => (rest, DEFAULT_CLI_EXECUTION_ID),
    };
    if prefix.is_empty() || goal.is_empty() || execution_id.is_empty() {
        return None;
    }
    Some((prefix, goal, execution_id))
}
