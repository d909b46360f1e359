// ABOUTME: Shared per-machine status tables and the terminal renderer.
// ABOUTME: Waiter tasks write cells; the foreground loop redraws on change.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::output::Output;
use crate::types::{HealthStatus, MachineState};

/// How a status value prints in the table.
pub trait StatusCell {
    fn cell(&self) -> String;
}

impl StatusCell for MachineState {
    fn cell(&self) -> String {
        self.as_str().to_string()
    }
}

impl StatusCell for HealthStatus {
    fn cell(&self) -> String {
        if self.total == 0 {
            "unchecked".to_string()
        } else {
            format!("{}/{} passing", self.passing, self.total)
        }
    }
}

/// Concurrent status table keyed by formatted machine id.
///
/// Each wait phase constructs its own tracker; state and health tables
/// never share a lock, so a health update cannot contend with a state
/// update. Writers hold the lock only for the map operation, never across
/// an await.
pub struct Tracker<T> {
    entries: Arc<RwLock<BTreeMap<String, T>>>,
}

impl<T> Clone for Tracker<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T> Default for Tracker<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Tracker<T> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    pub fn set(&self, id: impl Into<String>, value: T) {
        self.entries.write().insert(id.into(), value);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// True when every entry satisfies the predicate. Vacuously true for an
    /// empty table.
    pub fn all(&self, predicate: impl Fn(&T) -> bool) -> bool {
        self.entries.read().values().all(|v| predicate(v))
    }
}

impl<T: StatusCell> Tracker<T> {
    /// Copy the table out as display cells. The lock is released before the
    /// caller does any I/O with the result.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries
            .read()
            .iter()
            .map(|(id, value)| (id.clone(), value.cell()))
            .collect()
    }
}

/// `∃ key ∈ current: current[key] ≠ previous[key]`, over current's keys.
fn change_detected(current: &BTreeMap<String, String>, previous: &BTreeMap<String, String>) -> bool {
    current
        .iter()
        .any(|(key, value)| previous.get(key) != Some(value))
}

/// Redraws a tracker's table in place.
///
/// Each call snapshots the tracker, and if anything changed since the last
/// draw, clears exactly the lines it wrote last time and re-emits the block
/// sorted by machine id. The first draw never clears.
pub struct StatusRenderer<'a, T> {
    tracker: Tracker<T>,
    output: &'a Output,
    previous: BTreeMap<String, String>,
    lines_written: usize,
    first_run: bool,
}

impl<'a, T: StatusCell> StatusRenderer<'a, T> {
    pub fn new(tracker: Tracker<T>, output: &'a Output) -> Self {
        Self {
            tracker,
            output,
            previous: BTreeMap::new(),
            lines_written: 0,
            first_run: true,
        }
    }

    pub fn render(&mut self) {
        let current = self.tracker.snapshot();

        if change_detected(&current, &self.previous) {
            if !self.first_run {
                self.output.clear_lines_above(self.lines_written);
            }

            let colors = self.output.colors();
            let block: Vec<String> = current
                .iter()
                .map(|(id, cell)| {
                    format!("  Machine {} - {}", colors.bold(id), colors.green(cell))
                })
                .collect();
            self.output.line(&block.join("\n"));

            self.lines_written = current.len();
            self.previous = current;
        }

        self.first_run = false;
    }
}
