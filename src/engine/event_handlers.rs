// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::time::Duration;

use tracing::debug;

use crate::dag::{ScheduledTask, Scheduler, SchedulerStep};
use crate::engine::{TaskName, TaskOutcome};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// Ask the executor to abort every running task.
    AbortRunning,
    /// Every task has an outcome; the dispatcher loop should stop.
    RequestExit,
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer dispatcher loop should keep waiting for events.
    pub keep_running: bool,
}

/// Seed the run: dispatch the initial ready tasks.
pub fn handle_run_start(scheduler: &mut Scheduler) -> CoreStep {
    let step = scheduler.step_start();
    into_core_step(scheduler, step)
}

/// Handle a worker reporting that a task finished.
pub fn handle_task_finished(
    scheduler: &mut Scheduler,
    task: TaskName,
    outcome: TaskOutcome,
    elapsed: Duration,
) -> CoreStep {
    let step = scheduler.step_completion(&task, outcome, elapsed);
    into_core_step(scheduler, step)
}

/// Handle a cancellation request.
pub fn handle_cancel(scheduler: &mut Scheduler) -> CoreStep {
    let step = scheduler.step_cancel();
    into_core_step(scheduler, step)
}

/// Translate a scheduler step into commands for the IO shell.
///
/// Aborts are issued before new dispatches; after cancellation the scheduler
/// never schedules anything, so both never appear in the same step.
fn into_core_step(scheduler: &Scheduler, step: SchedulerStep) -> CoreStep {
    let mut commands = Vec::new();

    if step.abort_running {
        commands.push(CoreCommand::AbortRunning);
    }

    if !step.newly_scheduled.is_empty() {
        commands.push(CoreCommand::DispatchTasks(step.newly_scheduled));
    }

    if !step.newly_blocked.is_empty() {
        debug!(blocked = ?step.newly_blocked, "dependents blocked by failure");
    }

    let keep_running = !scheduler.is_finished();
    if !keep_running {
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}
