// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{RawReactorConfig, ReactorConfig};
use crate::errors::Result;

/// Load a build descriptor and return the raw, unvalidated config.
///
/// This only performs TOML deserialization. Use [`load_and_validate`] for a
/// config the rest of the crate can rely on.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawReactorConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawReactorConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a build descriptor from path and validate it.
///
/// Checks for unknown `depends_on` references, cycles between projects,
/// executions bound to unknown phases, and a root that is not a project.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ReactorConfig> {
    let raw_config = load_from_path(&path)?;
    let config = ReactorConfig::try_from(raw_config)?;
    Ok(config)
}

/// `Reactor.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Reactor.toml")
}
