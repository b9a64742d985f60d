// src/engine/result.rs

//! The record of a finished run.

use std::time::Duration;

use crate::engine::{TaskName, TaskOutcome};

/// Final outcome of one task plus when it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub task: TaskName,
    pub outcome: TaskOutcome,
    /// Dispatcher clock value at start; `None` if the task never ran.
    pub start_tick: Option<u64>,
    /// Dispatcher clock value at which the outcome was recorded.
    pub finish_tick: u64,
    /// Wall time spent running (zero if it never ran).
    pub elapsed: Duration,
}

/// Append-only sequence of task outcomes in the order they were recorded.
///
/// Completion order is not topological order: independent tasks may finish
/// in any order. Each task of the run appears exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    records: Vec<TaskRecord>,
}

impl RunResult {
    pub(crate) fn push(&mut self, record: TaskRecord) {
        self.records.push(record);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TaskRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, task: &str) -> Option<&TaskRecord> {
        self.records.iter().find(|r| r.task == task)
    }

    pub fn outcome_of(&self, task: &str) -> Option<&TaskOutcome> {
        self.get(task).map(|r| &r.outcome)
    }

    /// Task names in the order their outcomes were recorded.
    pub fn completion_order(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.task.as_str()).collect()
    }

    /// `true` if every task succeeded.
    pub fn is_success(&self) -> bool {
        self.records.iter().all(|r| r.outcome.is_success())
    }

    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Success))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Failed(_)))
    }

    pub fn blocked(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::BlockedBySourceFailure { .. }))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Cancelled))
    }

    fn count(&self, pred: impl Fn(&TaskOutcome) -> bool) -> usize {
        self.records.iter().filter(|r| pred(&r.outcome)).count()
    }
}

impl IntoIterator for RunResult {
    type Item = TaskRecord;
    type IntoIter = std::vec::IntoIter<TaskRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a RunResult {
    type Item = &'a TaskRecord;
    type IntoIter = std::slice::Iter<'a, TaskRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
