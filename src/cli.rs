// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{ArgGroup, Parser, ValueEnum};

use crate::config::default_config_path;
use crate::types::ReactorFailureBehaviour;

/// Command-line arguments for `reactor`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "reactor",
    version,
    about = "Build a multi-project reactor in dependency order, in parallel.",
    long_about = None
)]
#[command(group(
    ArgGroup::new("failure")
        .args(["fail_fast", "fail_at_end", "fail_never"])
        .multiple(false)
))]
pub struct CliArgs {
    /// Lifecycle phases and `prefix:goal[@id]` goals, in execution order.
    ///
    /// If omitted, `[reactor].default_goal` is used.
    #[arg(value_name = "GOALS")]
    pub goals: Vec<String>,

    /// Path to the build descriptor (TOML).
    #[arg(short = 'f', long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub file: PathBuf,

    /// Thread count: `4`, `1.5C` (per core) or `unbounded`.
    ///
    /// Overrides `[reactor].threads`.
    #[arg(short = 'T', long, value_name = "EXPR")]
    pub threads: Option<String>,

    /// Stop at the first failure.
    #[arg(long)]
    pub fail_fast: bool,

    /// Skip what depends on a failure; report failures at the end.
    #[arg(long)]
    pub fail_at_end: bool,

    /// Never fail the build because of a project failure.
    #[arg(long)]
    pub fail_never: bool,

    /// Interleave projects phase by phase (experimental).
    #[arg(long)]
    pub weave: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `REACTOR_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print build order and plans, but don't execute
    /// anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// Failure behaviour selected on the command line, if any.
    pub fn failure_behaviour(&self) -> Option<ReactorFailureBehaviour> {
        if self.fail_fast {
            Some(ReactorFailureBehaviour::FailFast)
        } else if self.fail_at_end {
            Some(ReactorFailureBehaviour::FailAtEnd)
        } else if self.fail_never {
            Some(ReactorFailureBehaviour::FailNever)
        } else {
            None
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
