// src/orchestrator/task.rs

use std::fmt;
use std::sync::Arc;

use crate::errors::{DistflowError, Result};
use crate::types::CompositeMode;

use super::{LeafTask, TaskName};

/// A node in a task tree.
///
/// Cloning is cheap: leaves and child lists are reference counted.
#[derive(Clone)]
pub enum Task {
    /// Indivisible work item.
    Leaf(LeafSpec),
    /// Ordered (`series`) or unordered (`parallel`) group.
    Composite(Composite),
    /// Another registered task, looked up by name when it runs.
    Ref(TaskName),
}

/// A leaf task plus the name it reports under.
#[derive(Clone)]
pub struct LeafSpec {
    pub name: TaskName,
    pub task: Arc<dyn LeafTask>,
    /// Explicit halt policy; `None` defers to `steps.<name>` in the settings.
    pub halt_on_error: Option<bool>,
}

/// Children plus the mode used to combine them. Fixed at construction.
#[derive(Clone)]
pub struct Composite {
    pub mode: CompositeMode,
    pub children: Arc<[Task]>,
}

impl Task {
    pub fn leaf(name: impl Into<TaskName>, task: impl LeafTask + 'static) -> Self {
        Task::Leaf(LeafSpec {
            name: name.into(),
            task: Arc::new(task),
            halt_on_error: None,
        })
    }

    /// Reference a task registered under `name`.
    pub fn named(name: impl Into<TaskName>) -> Self {
        Task::Ref(name.into())
    }

    /// Override the halt policy of a leaf. No-op for other variants.
    pub fn with_halt_on_error(mut self, halt: bool) -> Self {
        if let Task::Leaf(spec) = &mut self {
            spec.halt_on_error = Some(halt);
        }
        self
    }

    /// Short human label, used in logs and `CompositeFailure` lists.
    pub fn label(&self) -> String {
        match self {
            Task::Leaf(spec) => spec.name.clone(),
            Task::Ref(name) => name.clone(),
            Task::Composite(c) => {
                let inner: Vec<String> = c.children.iter().map(Task::label).collect();
                format!("{}({})", c.mode, inner.join(", "))
            }
        }
    }

    /// Names referenced directly or transitively through composites, but
    /// without following references.
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_refs(&mut out);
        out
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Task::Leaf(_) => {}
            Task::Ref(name) => out.push(name.as_str()),
            Task::Composite(c) => {
                for child in c.children.iter() {
                    child.collect_refs(out);
                }
            }
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Leaf(spec) => f
                .debug_struct("Leaf")
                .field("name", &spec.name)
                .field("halt_on_error", &spec.halt_on_error)
                .finish_non_exhaustive(),
            Task::Composite(c) => f
                .debug_struct("Composite")
                .field("mode", &c.mode)
                .field("children", &c.children)
                .finish(),
            Task::Ref(name) => f.debug_tuple("Ref").field(name).finish(),
        }
    }
}

fn composite(mode: CompositeMode, tasks: impl IntoIterator<Item = Task>) -> Result<Task> {
    let children: Vec<Task> = tasks.into_iter().collect();
    if children.is_empty() {
        return Err(DistflowError::EmptyComposite(mode));
    }
    Ok(Task::Composite(Composite {
        mode,
        children: children.into(),
    }))
}

/// Group that runs `tasks` one after another, stopping at the first failure.
pub fn series(tasks: impl IntoIterator<Item = Task>) -> Result<Task> {
    composite(CompositeMode::Series, tasks)
}

/// Group that starts all `tasks` at once and waits for every one to settle.
pub fn parallel(tasks: impl IntoIterator<Item = Task>) -> Result<Task> {
    composite(CompositeMode::Parallel, tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfiguration;
    use crate::orchestrator::LeafFuture;

    struct Noop;

    impl LeafTask for Noop {
        fn run<'a>(&'a self, _config: &'a RunConfiguration) -> LeafFuture<'a> {
            Box::pin(async { Ok(()) })
        }
    }

    #[test]
    fn empty_groups_are_rejected() {
        assert!(matches!(
            series(Vec::new()),
            Err(DistflowError::EmptyComposite(CompositeMode::Series))
        ));
        assert!(matches!(
            parallel(std::iter::empty()),
            Err(DistflowError::EmptyComposite(CompositeMode::Parallel))
        ));
    }

    #[test]
    fn labels_describe_nesting() {
        let t = series([
            Task::named("clean"),
            parallel([Task::leaf("fonts", Noop), Task::named("styles")]).unwrap(),
        ])
        .unwrap();
        assert_eq!(t.label(), "series(clean, parallel(fonts, styles))");
        assert_eq!(t.references(), vec!["clean", "styles"]);
    }

    #[test]
    fn halt_override_only_touches_leaves() {
        match Task::leaf("styles", Noop).with_halt_on_error(false) {
            Task::Leaf(spec) => assert_eq!(spec.halt_on_error, Some(false)),
            other => panic!("expected leaf, got {other:?}"),
        }
        assert!(matches!(
            Task::named("x").with_halt_on_error(false),
            Task::Ref(_)
        ));
    }
}
