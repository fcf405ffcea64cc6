// src/config/mod.rs

//! Build descriptor loading and validation.
//!
//! - `model.rs`: the TOML-backed data model.
//! - `loader.rs`: read a descriptor from disk.
//! - `validate.rs`: reject unknown references and cyclic project graphs.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    DefaultSection, ExecutionConfig, GoalConfig, LifecycleSection, PluginConfig, ProjectConfig,
    RawReactorConfig, ReactorConfig, ReactorSection,
};
