// src/orchestrator/report.rs

//! Per-run bookkeeping.
//!
//! The runner emits [`RunEvent`]s over an mpsc channel while tasks execute;
//! once the run settles they are folded into a [`RunReport`].

use std::time::Duration;

use crate::errors::DistflowError;

use super::TaskName;

/// Final state of a single leaf within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafOutcome {
    Succeeded,
    /// Failed and the failure propagated to the parent.
    Failed(String),
    /// Failed, but `halt_on_error = false` so the parent saw success.
    Tolerated(String),
    /// Never started because an earlier `series` sibling failed.
    Skipped,
}

impl LeafOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, LeafOutcome::Failed(_) | LeafOutcome::Tolerated(_))
    }
}

/// Events emitted by the runner while a task tree executes.
#[derive(Debug, Clone)]
pub enum RunEvent {
    Started {
        task: TaskName,
    },
    Finished {
        task: TaskName,
        outcome: LeafOutcome,
        elapsed: Duration,
    },
    Skipped {
        task: TaskName,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafRecord {
    pub name: TaskName,
    pub outcome: LeafOutcome,
    pub elapsed: Option<Duration>,
}

/// Result of running one named task.
#[derive(Debug)]
pub struct RunReport {
    pub task: TaskName,
    /// Leaves in the order they started.
    pub started: Vec<TaskName>,
    /// Leaves in the order they settled (skipped ones included).
    pub records: Vec<LeafRecord>,
    pub elapsed: Duration,
    /// Top-level failure, if any.
    pub error: Option<DistflowError>,
}

impl RunReport {
    pub(crate) fn from_events(
        task: TaskName,
        events: Vec<RunEvent>,
        elapsed: Duration,
        error: Option<DistflowError>,
    ) -> Self {
        let mut started = Vec::new();
        let mut records = Vec::new();

        for event in events {
            match event {
                RunEvent::Started { task } => started.push(task),
                RunEvent::Finished {
                    task,
                    outcome,
                    elapsed,
                } => records.push(LeafRecord {
                    name: task,
                    outcome,
                    elapsed: Some(elapsed),
                }),
                RunEvent::Skipped { task } => records.push(LeafRecord {
                    name: task,
                    outcome: LeafOutcome::Skipped,
                    elapsed: None,
                }),
            }
        }

        Self {
            task,
            started,
            records,
            elapsed,
            error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Outcome of the most recent run of leaf `name`.
    pub fn outcome_of(&self, name: &str) -> Option<&LeafOutcome> {
        self.records
            .iter()
            .rev()
            .find(|r| r.name == name)
            .map(|r| &r.outcome)
    }

    pub fn was_started(&self, name: &str) -> bool {
        self.started.iter().any(|s| s == name)
    }

    pub fn count(&self, pred: impl Fn(&LeafOutcome) -> bool) -> usize {
        self.records.iter().filter(|r| pred(&r.outcome)).count()
    }

    /// One-line summary for the final log message.
    pub fn summary(&self) -> String {
        format!(
            "{} succeeded, {} failed, {} tolerated, {} skipped in {} ms",
            self.count(|o| *o == LeafOutcome::Succeeded),
            self.count(|o| matches!(o, LeafOutcome::Failed(_))),
            self.count(|o| matches!(o, LeafOutcome::Tolerated(_))),
            self.count(|o| *o == LeafOutcome::Skipped),
            self.elapsed.as_millis()
        )
    }

    /// Turn the report into a plain `Result`, dropping it on failure.
    pub fn into_result(self) -> crate::errors::Result<RunReport> {
        match self.error {
            None => Ok(self),
            Some(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_fold_into_records() {
        let events = vec![
            RunEvent::Started { task: "a".into() },
            RunEvent::Started { task: "b".into() },
            RunEvent::Finished {
                task: "b".into(),
                outcome: LeafOutcome::Failed("boom".into()),
                elapsed: Duration::from_millis(3),
            },
            RunEvent::Finished {
                task: "a".into(),
                outcome: LeafOutcome::Succeeded,
                elapsed: Duration::from_millis(5),
            },
            RunEvent::Skipped { task: "c".into() },
        ];

        let report = RunReport::from_events("all".into(), events, Duration::from_millis(9), None);

        assert_eq!(report.started, vec!["a", "b"]);
        assert_eq!(report.records.len(), 3);
        assert_eq!(report.records[0].name, "b");
        assert_eq!(report.outcome_of("c"), Some(&LeafOutcome::Skipped));
        assert!(report.outcome_of("b").unwrap().is_failure());
        assert!(!report.was_started("c"));
        assert_eq!(
            report.summary(),
            "1 succeeded, 1 failed, 0 tolerated, 1 skipped in 9 ms"
        );
    }
}
