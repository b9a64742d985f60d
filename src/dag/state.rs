// src/dag/state.rs

//! Per-run task state transitions.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::dag::graph::DependencyGraph;
use crate::dag::readiness::ReadinessTracker;
use crate::dag::task::{TaskId, TaskState};

/// Mutable state of one run.
///
/// Every task is in exactly one of `Pending`, `Ready`, `Running` or
/// `Completed` at all times; the transition methods below are the only way to
/// move between them.
#[derive(Debug, Clone)]
pub struct SchedulerState {
    states: Vec<TaskState>,
    running: BTreeSet<TaskId>,
    completed: usize,
    readiness: ReadinessTracker,
}

impl SchedulerState {
    pub fn new(graph: &DependencyGraph) -> Self {
        Self {
            states: vec![TaskState::Pending; graph.len()],
            running: BTreeSet::new(),
            completed: 0,
            readiness: ReadinessTracker::new(graph),
        }
    }

    /// Mark every dependency-free task `Ready` and return them.
    pub fn seed(&mut self) -> Vec<TaskId> {
        let ready = self.readiness.initial_ready();
        for &id in &ready {
            self.states[id.index()] = TaskState::Ready;
        }
        ready
    }

    /// `Ready -> Running`. Returns `false` (and changes nothing) for a task in
    /// any other state.
    pub fn start(&mut self, id: TaskId) -> bool {
        if self.states[id.index()] != TaskState::Ready {
            warn!(task = %id, state = ?self.states[id.index()], "refusing to start task that is not Ready");
            return false;
        }
        self.states[id.index()] = TaskState::Running;
        self.running.insert(id);
        true
    }

    /// `Running -> Completed`, freeing the task's slot.
    ///
    /// With `release = true` the task counts as a met dependency and the
    /// dependents it unblocks are marked `Ready` and returned. With
    /// `release = false` (failure under the skip/abort policies, cancellation)
    /// its dependents stay `Pending`.
    pub fn finish(&mut self, graph: &DependencyGraph, id: TaskId, release: bool) -> Vec<TaskId> {
        if !self.running.remove(&id) {
            warn!(task = %graph.name_of(id), "finish reported for task that is not Running");
            return Vec::new();
        }
        self.states[id.index()] = TaskState::Completed;
        self.completed += 1;

        if !release {
            return Vec::new();
        }

        let unblocked = self.readiness.on_completed(graph, id);
        for &next in &unblocked {
            debug!(task = %graph.name_of(next), "marking Ready");
            self.states[next.index()] = TaskState::Ready;
        }
        unblocked
    }

    /// `Pending | Ready -> Completed` for a task that will never run
    /// (blocked by a failed dependency, or cancelled before it started).
    pub fn retire(&mut self, id: TaskId) -> bool {
        match self.states[id.index()] {
            TaskState::Pending | TaskState::Ready => {
                self.states[id.index()] = TaskState::Completed;
                self.completed += 1;
                true
            }
            TaskState::Running | TaskState::Completed => false,
        }
    }

    pub fn state_of(&self, id: TaskId) -> TaskState {
        self.states[id.index()]
    }

    pub fn is_running(&self, id: TaskId) -> bool {
        self.running.contains(&id)
    }

    pub fn running(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.running.iter().copied()
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn completed_count(&self) -> usize {
        self.completed
    }

    /// Tasks that have not started and have no outcome yet, in id order.
    pub fn not_started(&self) -> Vec<TaskId> {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, s)| matches!(s, TaskState::Pending | TaskState::Ready))
            .map(|(i, _)| TaskId::new(i))
            .collect()
    }

    /// Whether every task has reached `Completed`.
    pub fn all_completed(&self) -> bool {
        self.completed == self.states.len()
    }
}
