// src/engine/result.rs

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::dag::Project;
use crate::errors::BuildFailure;

/// Why a project did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The build was halted before the project could finish.
    Halted,
    /// The project, or one of its upstream projects, failed.
    Blacklisted,
    /// An upstream project never finished (its worker was lost).
    UpstreamIncomplete,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::Halted => "build halted",
            SkipReason::Blacklisted => "upstream failure",
            SkipReason::UpstreamIncomplete => "upstream did not finish",
        };
        f.write_str(s)
    }
}

/// Outcome of one project in one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectOutcome {
    /// `wall` spans first item start to last item end; `exec` excludes
    /// time spent waiting on other projects.
    Success { wall: Duration, exec: Duration },
    Failure { cause: BuildFailure, wall: Duration },
    Skipped(SkipReason),
}

impl ProjectOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ProjectOutcome::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ProjectOutcome::Failure { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ProjectOutcome::Skipped(_))
    }
}

#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub project: Arc<Project>,
    /// Index of the task segment the outcome belongs to.
    pub segment: usize,
    pub outcome: ProjectOutcome,
}

/// Append-only record of every project outcome plus build-level errors.
///
/// Safe to share between workers. At most one outcome is kept per
/// (segment, project); later ones are ignored.
#[derive(Debug, Default)]
pub struct BuildResult {
    summaries: Mutex<Vec<BuildSummary>>,
    errors: Mutex<Vec<String>>,
}

impl Clone for BuildResult {
    fn clone(&self) -> Self {
        Self {
            summaries: Mutex::new(self.summaries()),
            errors: Mutex::new(self.errors()),
        }
    }
}

impl BuildResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an outcome. Returns `false` if one was already recorded for
    /// this project in this segment.
    pub fn record(&self, project: &Arc<Project>, segment: usize, outcome: ProjectOutcome) -> bool {
        let mut summaries = self.summaries.lock().unwrap_or_else(|e| e.into_inner());
        if summaries
            .iter()
            .any(|s| s.segment == segment && s.project.key() == project.key())
        {
            return false;
        }
        summaries.push(BuildSummary {
            project: Arc::clone(project),
            segment,
            outcome,
        });
        true
    }

    pub fn has_outcome(&self, project: &Project, segment: usize) -> bool {
        let summaries = self.summaries.lock().unwrap_or_else(|e| e.into_inner());
        summaries
            .iter()
            .any(|s| s.segment == segment && s.project.key() == project.key())
    }

    /// Record an error that aborted part of the build outside any project.
    pub fn add_error(&self, error: impl Into<String>) {
        let mut errors = self.errors.lock().unwrap_or_else(|e| e.into_inner());
        errors.push(error.into());
    }

    /// Outcomes in the order they were recorded.
    pub fn summaries(&self) -> Vec<BuildSummary> {
        let summaries = self.summaries.lock().unwrap_or_else(|e| e.into_inner());
        summaries.clone()
    }

    /// Outcome of `key` in `segment`, if recorded.
    pub fn outcome(&self, key: &str, segment: usize) -> Option<ProjectOutcome> {
        let summaries = self.summaries.lock().unwrap_or_else(|e| e.into_inner());
        summaries
            .iter()
            .find(|s| s.segment == segment && s.project.key().as_str() == key)
            .map(|s| s.outcome.clone())
    }

    pub fn errors(&self) -> Vec<String> {
        let errors = self.errors.lock().unwrap_or_else(|e| e.into_inner());
        errors.clone()
    }

    fn count(&self, pred: impl Fn(&ProjectOutcome) -> bool) -> usize {
        let summaries = self.summaries.lock().unwrap_or_else(|e| e.into_inner());
        summaries.iter().filter(|s| pred(&s.outcome)).count()
    }

    pub fn success_count(&self) -> usize {
        self.count(ProjectOutcome::is_success)
    }

    pub fn failure_count(&self) -> usize {
        self.count(ProjectOutcome::is_failure)
    }

    pub fn skipped_count(&self) -> usize {
        self.count(ProjectOutcome::is_skipped)
    }

    pub fn len(&self) -> usize {
        self.count(|_| true)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }

    /// `0` if nothing failed and no build error was recorded, `1` otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.has_failures() || !self.errors().is_empty() {
            1
        } else {
            0
        }
    }
}
