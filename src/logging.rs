// src/logging.rs

//! Logging setup for `reactor` using `tracing` + `tracing-subscriber`.
//!
//! The filter is chosen as follows:
//! 1. `--log-level` CLI flag, applied to every target
//! 2. `REACTOR_LOG`, either a bare level ("debug") or full filter
//!    directives ("warn,reactor::engine=trace")
//! 3. `info`
//!
//! Logs go to stderr; stdout carries the reactor summary and dry-run output.
//! Thread ids are included from `debug` upwards, where interleaving between
//! workers matters.

use anyhow::{Result, anyhow};
use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

/// Environment variable consulted when `--log-level` is not given.
pub const LOG_ENV_VAR: &str = "REACTOR_LOG";

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(lvl) => EnvFilter::new(Level::from(lvl).as_str()),
        None => filter_from_env(std::env::var(LOG_ENV_VAR).ok().as_deref()),
    };
    let verbose = filter
        .max_level_hint()
        .is_some_and(|hint| hint >= LevelFilter::DEBUG);

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(verbose)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("installing log subscriber: {e}"))
}

/// Filter for the value of `REACTOR_LOG`; unset or unparseable means `info`.
pub fn filter_from_env(value: Option<&str>) -> EnvFilter {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return EnvFilter::new("info");
    };
    EnvFilter::try_new(raw).unwrap_or_else(|err| {
        eprintln!("ignoring {LOG_ENV_VAR}={raw:?}: {err}");
        EnvFilter::new("info")
    })
}

impl From<LogLevel> for Level {
    fn from(lvl: LogLevel) -> Self {
        match lvl {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_level_and_directives_are_accepted() {
        assert_eq!(
            filter_from_env(Some("debug")).max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
        assert_eq!(
            filter_from_env(Some("warn,reactor::engine=trace")).max_level_hint(),
            Some(LevelFilter::TRACE)
        );
    }

    #[test]
    fn missing_or_bad_value_falls_back_to_info() {
        assert_eq!(filter_from_env(None).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(filter_from_env(Some("  ")).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(
            filter_from_env(Some("reactor=nope")).max_level_hint(),
            Some(LevelFilter::INFO)
        );
    }

    #[test]
    fn cli_level_maps_to_tracing_level() {
        assert_eq!(Level::from(LogLevel::Warn), Level::WARN);
        assert_eq!(Level::from(LogLevel::Trace), Level::TRACE);
    }
}
