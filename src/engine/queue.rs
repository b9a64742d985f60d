// src/engine/queue.rs

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::dag::TaskId;

/// FIFO queue of tasks whose dependencies are all met but which have not
/// been given a worker slot yet.
///
/// Semantics:
/// - Tasks are started in the order they became ready; the initial ready set
///   keeps graph insertion order. A task that is ready is therefore never
///   overtaken indefinitely while slots free up.
/// - The queue is unbounded and never evicts: a ready task stays here until
///   it is popped to start or drained at cancellation.
/// - Pushing a task that is already queued is a no-op.
#[derive(Debug, Default)]
pub struct ReadyQueue {
    queue: VecDeque<TaskId>,
    queued: HashSet<TaskId>,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn contains(&self, task: TaskId) -> bool {
        self.queued.contains(&task)
    }

    /// Append a ready task. Returns `false` if it was already queued.
    pub fn push(&mut self, task: TaskId) -> bool {
        if !self.queued.insert(task) {
            debug!(task = %task, "task already in ready queue");
            return false;
        }
        self.queue.push_back(task);
        true
    }

    pub fn extend(&mut self, tasks: impl IntoIterator<Item = TaskId>) {
        for task in tasks {
            self.push(task);
        }
    }

    /// Take the oldest ready task.
    pub fn pop(&mut self) -> Option<TaskId> {
        let task = self.queue.pop_front()?;
        self.queued.remove(&task);
        Some(task)
    }

    /// Remove and return everything still queued, oldest first.
    pub fn drain(&mut self) -> Vec<TaskId> {
        self.queued.clear();
        let drained: Vec<TaskId> = self.queue.drain(..).collect();
        debug!(drained = drained.len(), "drained ready queue");
        drained
    }
}
