// src/types.rs

use std::fmt;

/// Build mode, selected once per run.
///
/// - `Development` (default): readable output with source maps.
/// - `Production`: minified output, no source maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Development,
    Production,
}

impl Mode {
    pub fn from_flag(production: bool) -> Self {
        if production {
            Mode::Production
        } else {
            Mode::Development
        }
    }

    pub fn is_production(self) -> bool {
        self == Mode::Production
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Development => f.write_str("development"),
            Mode::Production => f.write_str("production"),
        }
    }
}

/// How a composite task combines its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeMode {
    /// One child at a time, stop at the first failure.
    Series,
    /// All children at once, wait for every one to settle.
    Parallel,
}

impl fmt::Display for CompositeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompositeMode::Series => f.write_str("series"),
            CompositeMode::Parallel => f.write_str("parallel"),
        }
    }
}
