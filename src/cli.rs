// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::pipeline::DEFAULT_TASK;

/// Command-line arguments for `distflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "distflow",
    version,
    about = "Build a dist folder from fonts, stylesheets and scripts.",
    long_about = None
)]
pub struct CliArgs {
    /// Task to run (e.g. `clean`, `build`, `cleanbuild`).
    #[arg(value_name = "TASK", default_value = DEFAULT_TASK)]
    pub task: String,

    /// Path to the settings file (YAML, or TOML by extension).
    ///
    /// Default: `$DISTFLOW_CONFIG`, else `distflow.yml` in the current
    /// working directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Production build: minify, no source maps.
    ///
    /// `DISTFLOW_PRODUCTION=1` has the same effect.
    #[arg(long)]
    pub production: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DISTFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the registered task names and exit.
    #[arg(long)]
    pub list: bool,

    /// Resolve settings and print the task tree, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// Production flag from the command line or `DISTFLOW_PRODUCTION`.
    pub fn production_requested(&self) -> bool {
        self.production
            || std::env::var("DISTFLOW_PRODUCTION")
                .map(|v| is_truthy(&v))
                .unwrap_or(false)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_cleanbuild() {
        let args = CliArgs::try_parse_from(["distflow"]).unwrap();
        assert_eq!(args.task, "cleanbuild");
        assert!(!args.production);
        assert!(args.config.is_none());
    }

    #[test]
    fn parses_task_and_flags() {
        let args = CliArgs::try_parse_from([
            "distflow",
            "build",
            "--production",
            "--config",
            "conf/distflow.toml",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.task, "build");
        assert!(args.production_requested());
        assert_eq!(args.config, Some(PathBuf::from("conf/distflow.toml")));
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    }

    #[test]
    fn truthy_values() {
        assert!(is_truthy(" TRUE "));
        assert!(is_truthy("1"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy(""));
    }
}
