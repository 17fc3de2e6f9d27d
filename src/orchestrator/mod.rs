// src/orchestrator/mod.rs

//! Task orchestration for distflow.
//!
//! - [`task`] defines the `Task` tree (leaf / series / parallel / by-name
//!   reference) and the `series` / `parallel` combinators.
//! - [`graph`] is the name -> task registry, with validation of by-name
//!   references (unknown names, cycles).
//! - [`runner`] executes a named task against a `RunConfiguration`.
//! - [`report`] collects per-leaf outcomes into a `RunReport`.

use std::future::Future;
use std::pin::Pin;

use crate::config::RunConfiguration;

/// Canonical task name type used throughout the orchestrator.
pub type TaskName = String;

/// Boxed future returned by leaf tasks.
pub type LeafFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// A single, indivisible unit of build work.
///
/// Implementors perform their side effects (filesystem, child processes)
/// and resolve to `Ok(())` or an error describing what went wrong. The
/// orchestrator takes care of naming, logging and failure propagation.
pub trait LeafTask: Send + Sync {
    fn run<'a>(&'a self, config: &'a RunConfiguration) -> LeafFuture<'a>;
}

pub mod graph;
pub mod report;
pub mod runner;
pub mod task;

pub use graph::TaskGraph;
pub use report::{LeafOutcome, LeafRecord, RunEvent, RunReport};
pub use runner::Orchestrator;
pub use task::{Composite, LeafSpec, Task, parallel, series};
