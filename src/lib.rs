// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod orchestrator;
pub mod pipeline;
pub mod steps;
pub mod types;

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{RunConfiguration, default_config_path, load_and_validate};
use crate::errors::DistflowError;
use crate::orchestrator::{Orchestrator, TaskGraph};
use crate::types::Mode;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - the static task graph
/// - settings loading (fails before any task runs)
/// - the orchestrator run of the requested task
pub async fn run(args: CliArgs) -> Result<()> {
    let graph = pipeline::default_graph()?;

    if args.list {
        print_task_list(&graph);
        return Ok(());
    }

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let settings = load_and_validate(&config_path)?;
    let root = config_root_dir(&config_path);
    let mode = Mode::from_flag(args.production_requested());
    let run_config = RunConfiguration::new(root, settings, mode);

    if !graph.contains(&args.task) {
        return Err(DistflowError::TaskNotFound(args.task).into());
    }

    info!(
        config = %config_path.display(),
        root = %run_config.root.display(),
        mode = %mode,
        "loaded settings"
    );

    if args.dry_run {
        print_dry_run(&graph, &run_config, &args.task)?;
        return Ok(());
    }

    let orchestrator = Orchestrator::new(graph, run_config);
    orchestrator.run(&args.task).await?;
    Ok(())
}

/// Directory relative settings paths are resolved against.
///
/// - If the config path has a non-empty parent (e.g. "web/distflow.yml"),
///   we use that directory.
/// - If it's just a bare filename (parent = ""), we fall back to the current
///   working directory.
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            if parent.is_absolute() {
                parent.to_path_buf()
            } else {
                cwd.join(parent)
            }
        }
        _ => cwd,
    }
}

fn print_task_list(graph: &TaskGraph) {
    println!("tasks ({}):", graph.len());
    for name in graph.task_names() {
        let marker = if name == pipeline::DEFAULT_TASK {
            " (default)"
        } else {
            ""
        };
        println!("  - {name}{marker}");
    }
}

/// Dry-run output: resolved settings plus the task tree.
fn print_dry_run(graph: &TaskGraph, cfg: &RunConfiguration, task: &str) -> errors::Result<()> {
    println!("distflow dry-run");
    println!("  mode = {}", cfg.mode);
    println!("  root = {}", cfg.root.display());
    println!("  dist = {}", cfg.dist_dir().display());
    println!("  fonts = {:?}", cfg.paths.fonts);
    println!("  sass_entries = {:?}", cfg.paths.sass_entries);
    println!("  sass_libs = {:?}", cfg.paths.sass_libs);
    println!("  entries = {:?}", cfg.paths.entries);
    println!("  mlentries = {:?}", cfg.paths.mlentries);
    println!("  tools = sass: {}, esbuild: {}", cfg.tools.sass, cfg.tools.esbuild);
    for (name, policy) in cfg.steps.iter() {
        println!("  steps.{name}.halt_on_error = {}", policy.halt_on_error);
    }
    println!();
    print!("{}", graph.describe(task)?);

    debug!("dry-run complete (no execution)");
    Ok(())
}
