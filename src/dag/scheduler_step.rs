// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::task::ScheduledTask;
use crate::engine::TaskName;

/// Structured result of a single scheduler "step".
///
/// This is useful for tests that want to manually step the DAG and make
/// assertions about what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks that were given a worker slot in this step.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// Tasks that will never run because a dependency failed.
    pub newly_blocked: Vec<TaskName>,
    /// Whether running tasks should be aborted (cancellation with
    /// `CancelBehaviour::Abort`).
    pub abort_running: bool,
    /// Whether this step gave every task a terminal outcome.
    pub run_just_finished: bool,
}

impl SchedulerStep {
    pub fn is_noop(&self) -> bool {
        self.newly_scheduled.is_empty()
            && self.newly_blocked.is_empty()
            && !self.abort_running
            && !self.run_just_finished
    }
}
