// src/engine/core.rs

//! Pure core dispatcher state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated scheduler state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Dispatcher`) is responsible for:
//! - waiting on the completion channel
//! - sending `ScheduledTask`s to the executor
//! - forwarding abort requests
//!
//! The core is intended to be extensively unit tested without any Tokio,
//! channels or workers.

use crate::dag::Scheduler;
use crate::engine::event_handlers::{
    handle_cancel, handle_run_start, handle_task_finished, CoreStep,
};
use crate::engine::result::RunResult;
use crate::engine::RuntimeEvent;

/// Pure core runtime state.
///
/// It owns the scheduler (and with it the whole per-run state), has **no**
/// channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler) -> Self {
        Self { scheduler }
    }

    /// Whether every task has an outcome.
    pub fn is_finished(&self) -> bool {
        self.scheduler.is_finished()
    }

    /// Read-only access to the scheduler (for tests and diagnostics).
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Start the run and return the initial dispatch commands.
    pub fn start(&mut self) -> CoreStep {
        handle_run_start(&mut self.scheduler)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskFinished {
                task,
                outcome,
                elapsed,
            } => handle_task_finished(&mut self.scheduler, task, outcome, elapsed),
            RuntimeEvent::CancelRequested => handle_cancel(&mut self.scheduler),
        }
    }

    pub fn into_result(self) -> RunResult {
        self.scheduler.into_result()
    }
}
