// src/dag/readiness.rs

//! Unmet-dependency bookkeeping.

use tracing::{debug, warn};

use crate::dag::graph::DependencyGraph;
use crate::dag::task::TaskId;

/// Tracks how many dependencies of each task are still unmet and reports
/// tasks the moment they become ready.
///
/// Every task is released (returned from [`initial_ready`] or
/// [`on_completed`]) at most once per tracker.
///
/// [`initial_ready`]: ReadinessTracker::initial_ready
/// [`on_completed`]: ReadinessTracker::on_completed
#[derive(Debug, Clone)]
pub struct ReadinessTracker {
    remaining: Vec<usize>,
    released: Vec<bool>,
    completed: Vec<bool>,
}

impl ReadinessTracker {
    pub fn new(graph: &DependencyGraph) -> Self {
        let remaining = graph.tasks().iter().map(|t| graph.in_degree(t.id)).collect();
        Self {
            remaining,
            released: vec![false; graph.len()],
            completed: vec![false; graph.len()],
        }
    }

    /// Tasks with no dependencies, in insertion order.
    ///
    /// Repeated calls return only tasks that were not released before.
    pub fn initial_ready(&mut self) -> Vec<TaskId> {
        let mut ready = Vec::new();
        for (i, &count) in self.remaining.iter().enumerate() {
            if count == 0 && !self.released[i] {
                self.released[i] = true;
                ready.push(TaskId::new(i));
            }
        }
        ready
    }

    /// Record that `task` completed and return the dependents it unblocked.
    ///
    /// A second call for the same task returns nothing.
    pub fn on_completed(&mut self, graph: &DependencyGraph, task: TaskId) -> Vec<TaskId> {
        if std::mem::replace(&mut self.completed[task.index()], true) {
            warn!(task = %graph.name_of(task), "completion reported twice; ignoring");
            return Vec::new();
        }

        let mut unblocked = Vec::new();

        for dependent in graph.dependents_of(task) {
            let i = dependent.index();
            self.remaining[i] = self.remaining[i].saturating_sub(1);
            if self.remaining[i] == 0 && !self.released[i] {
                self.released[i] = true;
                debug!(
                    task = %graph.name_of(dependent),
                    after = %graph.name_of(task),
                    "all dependencies met"
                );
                unblocked.push(dependent);
            }
        }

        unblocked
    }

    /// Number of dependencies of `task` that have not completed yet.
    pub fn remaining(&self, task: TaskId) -> usize {
        self.remaining[task.index()]
    }

    pub fn is_released(&self, task: TaskId) -> bool {
        self.released[task.index()]
    }
}
