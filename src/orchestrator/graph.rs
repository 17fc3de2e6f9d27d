// src/orchestrator/graph.rs

use std::collections::BTreeMap;
use std::fmt::Write as _;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{DistflowError, Result};

use super::{Task, TaskName};

/// Registry of named tasks.
///
/// Tasks are registered once at startup and never mutated afterwards; the
/// runner only reads from it.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    tasks: BTreeMap<TaskName, Task>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `task` under `name`. Names are unique.
    pub fn register_task(&mut self, name: impl Into<TaskName>, task: Task) -> Result<()> {
        let name = name.into();
        if self.tasks.contains_key(&name) {
            return Err(DistflowError::DuplicateTask(name));
        }
        self.tasks.insert(name, task);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// All registered names, sorted.
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Check that every by-name reference resolves and that references do
    /// not form a cycle.
    pub fn validate(&self) -> Result<()> {
        // Edge direction: task -> referenced task.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        for name in self.tasks.keys() {
            graph.add_node(name.as_str());
        }

        for (name, task) in self.tasks.iter() {
            for target in task.references() {
                if !self.tasks.contains_key(target) {
                    return Err(DistflowError::TaskNotFound(format!(
                        "{target} (referenced by '{name}')"
                    )));
                }
                graph.add_edge(name.as_str(), target, ());
            }
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(DistflowError::TaskCycle(format!(
                "task '{}' (indirectly) references itself",
                cycle.node_id()
            ))),
        }
    }

    /// Render the composition tree below `name`, one task per line.
    ///
    /// ```text
    /// cleanbuild: series
    ///   clean
    ///   build: parallel
    ///     fonts
    /// ```
    pub fn describe(&self, name: &str) -> Result<String> {
        let task = self
            .get(name)
            .ok_or_else(|| DistflowError::TaskNotFound(name.to_string()))?;
        let mut out = String::new();
        self.describe_into(&mut out, Some(name), task, 0, &mut Vec::new());
        Ok(out)
    }

    fn describe_into<'a>(
        &'a self,
        out: &mut String,
        name: Option<&'a str>,
        task: &'a Task,
        depth: usize,
        stack: &mut Vec<&'a str>,
    ) {
        let indent = "  ".repeat(depth);
        match task {
            Task::Leaf(spec) => {
                let _ = writeln!(out, "{indent}{}", name.unwrap_or(&spec.name));
            }
            Task::Ref(target) => match self.get(target) {
                Some(inner) if !stack.contains(&target.as_str()) => {
                    stack.push(target);
                    self.describe_into(out, Some(target.as_str()), inner, depth, stack);
                    stack.pop();
                }
                Some(_) => {
                    let _ = writeln!(out, "{indent}{target} (cycle)");
                }
                None => {
                    let _ = writeln!(out, "{indent}{target} (missing)");
                }
            },
            Task::Composite(c) => {
                let _ = match name {
                    Some(n) => writeln!(out, "{indent}{n}: {}", c.mode),
                    None => writeln!(out, "{indent}{}", c.mode),
                };
                for child in c.children.iter() {
                    self.describe_into(out, None, child, depth + 1, stack);
                }
            }
        }
    }

    /// Leaf names reachable from `task`, following references, in
    /// declaration order. Used to report series siblings that never ran.
    pub fn leaf_names(&self, task: &Task) -> Vec<TaskName> {
        let mut out = Vec::new();
        self.collect_leaves(task, &mut out, &mut Vec::new());
        out
    }

    fn collect_leaves<'a>(
        &'a self,
        task: &'a Task,
        out: &mut Vec<TaskName>,
        stack: &mut Vec<&'a str>,
    ) {
        match task {
            Task::Leaf(spec) => {
                if !out.contains(&spec.name) {
                    out.push(spec.name.clone());
                }
            }
            Task::Ref(target) => {
                if stack.contains(&target.as_str()) {
                    return;
                }
                if let Some(inner) = self.get(target) {
                    stack.push(target);
                    self.collect_leaves(inner, out, stack);
                    stack.pop();
                }
            }
            Task::Composite(c) => {
                for child in c.children.iter() {
                    self.collect_leaves(child, out, stack);
                }
            }
        }
    }
}
