// src/orchestrator/runner.rs

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::RunConfiguration;
use crate::errors::{DistflowError, Result};
use crate::types::CompositeMode;

use super::report::{LeafOutcome, RunEvent, RunReport};
use super::task::LeafSpec;
use super::{Task, TaskGraph};

type TaskFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// Runs named tasks from a [`TaskGraph`] against one [`RunConfiguration`].
///
/// Both are frozen for the lifetime of the orchestrator; leaf tasks get
/// the configuration by reference.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    graph: Arc<TaskGraph>,
    config: Arc<RunConfiguration>,
}

/// State shared by every task of a single run.
#[derive(Clone)]
struct RunContext {
    graph: Arc<TaskGraph>,
    config: Arc<RunConfiguration>,
    events: mpsc::UnboundedSender<RunEvent>,
}

impl RunContext {
    fn emit(&self, event: RunEvent) {
        // The receiver lives until the run has settled.
        let _ = self.events.send(event);
    }
}

impl Orchestrator {
    pub fn new(graph: TaskGraph, config: RunConfiguration) -> Self {
        Self {
            graph: Arc::new(graph),
            config: Arc::new(config),
        }
    }

    /// Run `name` and return a report, whether or not the run succeeded.
    ///
    /// Errors returned directly (rather than inside the report) happen
    /// before any task starts: unknown name, unresolved reference, cycle.
    pub async fn execute(&self, name: &str) -> Result<RunReport> {
        let task = self
            .graph
            .get(name)
            .cloned()
            .ok_or_else(|| DistflowError::TaskNotFound(name.to_string()))?;
        self.graph.validate()?;

        let (tx, mut rx) = mpsc::unbounded_channel::<RunEvent>();
        let ctx = RunContext {
            graph: Arc::clone(&self.graph),
            config: Arc::clone(&self.config),
            events: tx,
        };

        info!(task = %name, mode = %self.config.mode, "running task");
        let started = Instant::now();

        let result = match tokio::spawn(execute_task(task, ctx)).await {
            Ok(res) => res,
            Err(join_err) => Err(DistflowError::Other(anyhow!(
                "task '{name}' aborted: {join_err}"
            ))),
        };
        let elapsed = started.elapsed();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        let report = RunReport::from_events(name.to_string(), events, elapsed, result.err());
        match &report.error {
            None => info!(
                task = %name,
                elapsed_ms = elapsed.as_millis() as u64,
                summary = %report.summary(),
                "task finished"
            ),
            Some(err) => error!(
                task = %name,
                elapsed_ms = elapsed.as_millis() as u64,
                summary = %report.summary(),
                error = %err,
                "task failed"
            ),
        }

        Ok(report)
    }

    /// Run `name`; `Ok` only if it and every transitive child succeeded.
    pub async fn run(&self, name: &str) -> Result<RunReport> {
        self.execute(name).await?.into_result()
    }
}

fn execute_task(task: Task, ctx: RunContext) -> TaskFuture {
    Box::pin(async move {
        match task {
            Task::Leaf(spec) => run_leaf(spec, &ctx).await,
            Task::Ref(name) => {
                let inner = ctx
                    .graph
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| DistflowError::TaskNotFound(name.clone()))?;
                debug!(task = %name, "entering task");
                execute_task(inner, ctx).await
            }
            Task::Composite(c) => match c.mode {
                CompositeMode::Series => run_series(c.children, ctx).await,
                CompositeMode::Parallel => run_parallel(c.children, ctx).await,
            },
        }
    })
}

async fn run_leaf(spec: LeafSpec, ctx: &RunContext) -> Result<()> {
    let halt_on_error = spec
        .halt_on_error
        .unwrap_or_else(|| ctx.config.step_policy(&spec.name).halt_on_error);

    info!(task = %spec.name, "starting task");
    ctx.emit(RunEvent::Started {
        task: spec.name.clone(),
    });

    let started = Instant::now();
    let result = run_isolated(&spec, ctx).await;
    let elapsed = started.elapsed();
    let elapsed_ms = elapsed.as_millis() as u64;

    match result {
        Ok(()) => {
            info!(task = %spec.name, elapsed_ms, "finished task");
            ctx.emit(RunEvent::Finished {
                task: spec.name,
                outcome: LeafOutcome::Succeeded,
                elapsed,
            });
            Ok(())
        }
        Err(err) if !halt_on_error => {
            warn!(
                task = %spec.name,
                elapsed_ms,
                error = %format!("{err:#}"),
                "task failed; continuing (halt_on_error = false)"
            );
            ctx.emit(RunEvent::Finished {
                task: spec.name,
                outcome: LeafOutcome::Tolerated(format!("{err:#}")),
                elapsed,
            });
            Ok(())
        }
        Err(err) => {
            error!(
                task = %spec.name,
                elapsed_ms,
                error = %format!("{err:#}"),
                "task failed"
            );
            ctx.emit(RunEvent::Finished {
                task: spec.name.clone(),
                outcome: LeafOutcome::Failed(format!("{err:#}")),
                elapsed,
            });
            Err(DistflowError::leaf(spec.name, err))
        }
    }
}

/// Drive the leaf on its own tokio task so a panic surfaces as an ordinary
/// failure of this leaf instead of unwinding through its parents.
async fn run_isolated(spec: &LeafSpec, ctx: &RunContext) -> anyhow::Result<()> {
    let task = Arc::clone(&spec.task);
    let config = Arc::clone(&ctx.config);
    match tokio::spawn(async move { task.run(&config).await }).await {
        Ok(result) => result,
        Err(join_err) if join_err.is_panic() => {
            Err(anyhow!("panicked: {}", panic_message(join_err.into_panic())))
        }
        Err(join_err) => Err(anyhow!("aborted: {join_err}")),
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run children one at a time; the first failure stops the group and the
/// remaining children are reported as skipped.
async fn run_series(children: Arc<[Task]>, ctx: RunContext) -> Result<()> {
    for (idx, child) in children.iter().enumerate() {
        if let Err(err) = execute_task(child.clone(), ctx.clone()).await {
            for rest in children[idx + 1..].iter() {
                for leaf in ctx.graph.leaf_names(rest) {
                    debug!(task = %leaf, "skipping task after earlier failure in series");
                    ctx.emit(RunEvent::Skipped { task: leaf });
                }
            }
            return Err(err);
        }
    }
    Ok(())
}

/// Start every child, then wait for all of them. Failures do not cancel
/// siblings that are already running.
async fn run_parallel(children: Arc<[Task]>, ctx: RunContext) -> Result<()> {
    let handles: Vec<_> = children
        .iter()
        .map(|child| {
            let handle = tokio::spawn(execute_task(child.clone(), ctx.clone()));
            (child.label(), handle)
        })
        .collect();

    let mut failed = Vec::new();
    for (label, handle) in handles {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                debug!(task = %label, error = %err, "parallel child failed");
                failed.push(label);
            }
            Err(join_err) => {
                error!(task = %label, error = %join_err, "parallel child aborted");
                failed.push(label);
            }
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(DistflowError::CompositeFailure {
            mode: CompositeMode::Parallel,
            failed,
        })
    }
}
