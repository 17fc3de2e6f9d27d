// src/config/mod.rs

//! Settings loading and validation for distflow.
//!
//! Responsibilities:
//! - Define the YAML/TOML-backed data model (`model.rs`).
//! - Load a settings file from disk (`loader.rs`).
//! - Validate basic invariants before any task runs (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    PathsSection, RawSettingsFile, RunConfiguration, SettingsFile, StepPolicy, ToolsSection,
};
