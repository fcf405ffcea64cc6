// src/dag/project.rs

//! Build units of the reactor.

use std::borrow::Borrow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Stable identity of a project (`group:artifact`).
///
/// Cheap to clone; every component refers to projects through this key or
/// through a shared `Arc<Project>`, never through a copy of the project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectKey(Arc<str>);

impl ProjectKey {
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Arc::from(key.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ProjectKey {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl Borrow<str> for ProjectKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// One module of a multi-module build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    key: ProjectKey,
    /// Working directory for the project's executions, if any.
    dir: Option<PathBuf>,
}

impl Project {
    pub fn new(key: impl Into<ProjectKey>) -> Self {
        Self {
            key: key.into(),
            dir: None,
        }
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn key(&self) -> &ProjectKey {
        &self.key
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.key, f)
    }
}
