use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use distflow::config::RunConfiguration;
use distflow::orchestrator::{LeafFuture, LeafTask, Task};

/// Shared, ordered log of what fake leaves did.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, entry: String) {
        self.entries.lock().unwrap().push(entry);
    }

    /// All entries, e.g. `["start:a", "end:a", "start:b"]`.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn started(&self, name: &str) -> bool {
        self.position(&format!("start:{name}")).is_some()
    }

    pub fn finished(&self, name: &str) -> bool {
        self.position(&format!("end:{name}")).is_some()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries.lock().unwrap().iter().position(|e| e == entry)
    }
}

/// A fake leaf task that:
/// - records `start:<name>` / `end:<name>` in a shared [`Journal`]
/// - optionally sleeps in between
/// - succeeds, fails or panics as configured
#[derive(Debug, Clone)]
pub struct RecordingLeaf {
    name: String,
    journal: Journal,
    fail: bool,
    panic: bool,
    delay: Duration,
}

impl RecordingLeaf {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            journal: journal.clone(),
            fail: false,
            panic: false,
            delay: Duration::ZERO,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Panic after recording `start:<name>`; `end:<name>` is never written.
    pub fn panicking(mut self) -> Self {
        self.panic = true;
        self
    }

    pub fn delay_ms(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }

    /// Wrap into a `Task::Leaf` named after this fake.
    pub fn task(self) -> Task {
        let name = self.name.clone();
        Task::leaf(name, self)
    }
}

impl LeafTask for RecordingLeaf {
    fn run<'a>(&'a self, _config: &'a RunConfiguration) -> LeafFuture<'a> {
        Box::pin(async move {
            self.journal.push(format!("start:{}", self.name));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.panic {
                panic!("{} panicked on purpose", self.name);
            }
            self.journal.push(format!("end:{}", self.name));
            if self.fail {
                Err(anyhow!("{} failed on purpose", self.name))
            } else {
                Ok(())
            }
        })
    }
}
