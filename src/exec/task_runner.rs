// src/exec/task_runner.rs

//! Individual task runner.

use std::any::Any;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};

/// Run a single task's unit of work and report exactly one `TaskFinished`
/// event for it.
///
/// - The work runs in its own Tokio task, so a panic inside it is caught and
///   reported as [`TaskOutcome::Failed`] instead of tearing down the worker.
/// - If the cancel channel fires, the work is aborted and the outcome is
///   [`TaskOutcome::Cancelled`]. A cancel sender dropped without firing is
///   not a cancellation.
pub async fn run_task(
    task: ScheduledTask,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    info!(
        task = %task.name,
        tick = task.start_tick,
        work = ?task.work,
        "running task"
    );

    let started = Instant::now();
    let mut handle = tokio::spawn(task.work.execute());

    let outcome = tokio::select! {
        joined = &mut handle => outcome_from_join(&task, joined),

        Ok(()) = &mut cancel_rx => {
            info!(task = %task.name, "cancellation requested for running task; aborting work");
            handle.abort();
            TaskOutcome::Cancelled
        }
    };

    let elapsed = started.elapsed();
    debug!(task = %task.name, ?elapsed, outcome = %outcome, "task runner finished");

    if runtime_tx
        .send(RuntimeEvent::TaskFinished {
            task: task.name.clone(),
            outcome,
            elapsed,
        })
        .await
        .is_err()
    {
        error!(
            task = %task.name,
            "dispatcher is gone; dropping TaskFinished event"
        );
    }
}

fn outcome_from_join(
    task: &ScheduledTask,
    joined: Result<anyhow::Result<()>, JoinError>,
) -> TaskOutcome {
    match joined {
        Ok(Ok(())) => TaskOutcome::Success,
        Ok(Err(err)) => {
            warn!(task = %task.name, error = %err, "task work returned an error");
            TaskOutcome::Failed(format!("{err:#}"))
        }
        Err(err) if err.is_panic() => {
            let message = panic_message(err.into_panic());
            error!(task = %task.name, panic = %message, "task work panicked");
            TaskOutcome::Failed(format!("panicked: {message}"))
        }
        Err(err) => {
            warn!(task = %task.name, error = %err, "task work was cancelled by the runtime");
            TaskOutcome::Cancelled
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send + 'static>) -> String {
    match payload.downcast::<String>() {
        Ok(s) => *s,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(s) => (*s).to_string(),
            Err(_) => "unknown panic payload".to_string(),
        },
    }
}
