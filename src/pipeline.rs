// src/pipeline.rs

//! Static declaration of the standard build graph.
//!
//! ```text
//! cleanbuild = series(clean, build)          (default)
//! build      = parallel(assets, styles, javascript)
//! assets     = parallel(fonts)
//! javascript = parallel(scripts:bundle, scripts:copy)
//! ```
//!
//! Leaves write to disjoint subdirectories of the output root (`fonts/`,
//! `css/`, `js/`), which is what makes running them in parallel safe.

use crate::errors::Result;
use crate::orchestrator::{Task, TaskGraph, parallel, series};
use crate::steps::{Clean, CopyFiles, ScriptBundler, StyleCompiler};

/// Task run when no name is given on the command line.
pub const DEFAULT_TASK: &str = "cleanbuild";

/// Names of all leaf steps; also the keys accepted under `steps:` in the
/// settings file.
pub const LEAF_TASKS: &[&str] = &["clean", "fonts", "styles", "scripts:bundle", "scripts:copy"];

/// Register the standard tasks into `graph`.
pub fn register_default_tasks(graph: &mut TaskGraph) -> Result<()> {
    graph.register_task("clean", Task::leaf("clean", Clean))?;
    graph.register_task("fonts", Task::leaf("fonts", CopyFiles::fonts()))?;
    graph.register_task("styles", Task::leaf("styles", StyleCompiler))?;
    graph.register_task("scripts:bundle", Task::leaf("scripts:bundle", ScriptBundler))?;
    graph.register_task(
        "scripts:copy",
        Task::leaf("scripts:copy", CopyFiles::prebuilt_scripts()),
    )?;

    graph.register_task("assets", parallel([Task::named("fonts")])?)?;
    graph.register_task(
        "javascript",
        parallel([Task::named("scripts:bundle"), Task::named("scripts:copy")])?,
    )?;
    graph.register_task(
        "build",
        parallel([
            Task::named("assets"),
            Task::named("styles"),
            Task::named("javascript"),
        ])?,
    )?;
    graph.register_task(
        "cleanbuild",
        series([Task::named("clean"), Task::named("build")])?,
    )?;

    Ok(())
}

/// Fresh graph with the standard tasks registered.
pub fn default_graph() -> Result<TaskGraph> {
    let mut graph = TaskGraph::new();
    register_default_tasks(&mut graph)?;
    graph.validate()?;
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_graph_is_valid_and_complete() {
        let graph = default_graph().unwrap();
        for name in LEAF_TASKS
            .iter()
            .copied()
            .chain(["assets", "javascript", "build", DEFAULT_TASK])
        {
            assert!(graph.contains(name), "missing task {name}");
        }
    }

    #[test]
    fn cleanbuild_runs_clean_before_build() {
        let graph = default_graph().unwrap();
        assert_eq!(
            graph.describe(DEFAULT_TASK).unwrap(),
            "cleanbuild: series\n\
             \x20 clean\n\
             \x20 build: parallel\n\
             \x20   assets: parallel\n\
             \x20     fonts\n\
             \x20   styles\n\
             \x20   javascript: parallel\n\
             \x20     scripts:bundle\n\
             \x20     scripts:copy\n"
        );
    }

    #[test]
    fn leaf_steps_are_registered_once() {
        let mut graph = default_graph().unwrap();
        assert!(register_default_tasks(&mut graph).is_err());
    }
}
