// src/errors.rs

//! Crate-wide error type and helpers.

use thiserror::Error;

use crate::types::CompositeMode;

#[derive(Error, Debug)]
pub enum DistflowError {
    #[error("Failed to load settings: {0}")]
    ConfigLoad(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Task already registered: {0}")]
    DuplicateTask(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in task graph: {0}")]
    TaskCycle(String),

    #[error("{0} composite needs at least one child task")]
    EmptyComposite(CompositeMode),

    #[error("Task '{task}' failed: {message}")]
    LeafTask { task: String, message: String },

    #[error("{mode} group failed; failed children: {}", failed.join(", "))]
    CompositeFailure {
        mode: CompositeMode,
        failed: Vec<String>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DistflowError {
    /// Wrap an arbitrary leaf error (usually an `anyhow` chain) as a
    /// `LeafTask` failure for `task`.
    pub fn leaf(task: impl Into<String>, err: impl std::fmt::Display) -> Self {
        DistflowError::LeafTask {
            task: task.into(),
            message: format!("{err:#}"),
        }
    }

    /// Whether this error belongs to the "settings could not be loaded"
    /// family (missing file, malformed YAML/TOML, bad paths).
    pub fn is_config_load(&self) -> bool {
        matches!(
            self,
            DistflowError::ConfigLoad(_) | DistflowError::Yaml(_) | DistflowError::Toml(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DistflowError>;
