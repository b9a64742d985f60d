// src/exec/executor_loop.rs

//! Main executor loop that manages running task workers.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskName};
use crate::exec::task_runner::run_task;

/// Requests accepted by the executor loop.
#[derive(Debug, Clone)]
pub enum ExecutorRequest {
    /// Start a worker for this task.
    Run(ScheduledTask),
    /// Abort every worker that is still running.
    AbortAll,
}

/// Internal handle for a currently-running worker.
///
/// - `cancel` is used by the executor to request that the work be aborted.
/// - `handle` is the Tokio task running [`run_task`].
struct ActiveTask {
    cancel: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

/// Spawn the background executor loop.
///
/// The returned `mpsc::Sender<ExecutorRequest>` is what
/// `RealExecutorBackend` uses to hand over work. Each scheduled task runs in
/// its own Tokio task; the dispatcher never schedules more than
/// `max_concurrent` at once, so the loop itself does no slot accounting.
/// Completions go straight from the workers to `runtime_tx`.
pub fn spawn_executor(runtime_tx: mpsc::Sender<RuntimeEvent>) -> mpsc::Sender<ExecutorRequest> {
    let (tx, mut rx) = mpsc::channel::<ExecutorRequest>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        let mut active: HashMap<TaskName, ActiveTask> = HashMap::new();

        while let Some(request) = rx.recv().await {
            active.retain(|_, t| !t.handle.is_finished());

            match request {
                ExecutorRequest::Run(task) => start_worker(task, &mut active, &runtime_tx),
                ExecutorRequest::AbortAll => abort_all(&mut active),
            }
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}

/// Spawn a worker for a newly scheduled task.
fn start_worker(
    task: ScheduledTask,
    active: &mut HashMap<TaskName, ActiveTask>,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) {
    let name = task.name.clone();

    if active.contains_key(&name) {
        warn!(
            task = %name,
            "task already has a running worker; ignoring duplicate scheduling request"
        );
        return;
    }

    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    let rt_tx = runtime_tx.clone();
    let spawn_name = name.clone();

    let handle = tokio::spawn(async move {
        run_task(task, rt_tx, cancel_rx).await;
        debug!(task = %spawn_name, "worker finished");
    });

    active.insert(
        name,
        ActiveTask {
            cancel: Some(cancel_tx),
            handle,
        },
    );
}

/// Ask every running worker to abort its work.
fn abort_all(active: &mut HashMap<TaskName, ActiveTask>) {
    info!(running = active.len(), "aborting all running workers");

    for (name, task) in active.iter_mut() {
        match task.cancel.take() {
            Some(cancel) => {
                if cancel.send(()).is_err() {
                    debug!(task = %name, "worker already finished while aborting");
                }
            }
            None => {
                debug!(task = %name, "no cancel sender present; worker was already aborted");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::dag::{TaskId, Work};
    use crate::engine::TaskOutcome;

    fn scheduled(i: usize, name: &str, secs: u64) -> ScheduledTask {
        ScheduledTask {
            id: TaskId::new(i),
            name: name.to_string(),
            work: Work::sleep(Duration::from_secs(secs)),
            start_tick: i as u64 + 1,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_tasks_and_reports_completion() {
        let (rt_tx, mut rt_rx) = mpsc::channel(8);
        let exec_tx = spawn_executor(rt_tx);

        exec_tx.send(ExecutorRequest::Run(scheduled(0, "slow", 5))).await.unwrap();
        exec_tx.send(ExecutorRequest::Run(scheduled(1, "fast", 1))).await.unwrap();

        let mut finished = Vec::new();
        for _ in 0..2 {
            match rt_rx.recv().await {
                Some(RuntimeEvent::TaskFinished { task, outcome, .. }) => {
                    assert_eq!(outcome, TaskOutcome::Success);
                    finished.push(task);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }

        assert_eq!(finished, ["fast", "slow"]);
    }

    #[tokio::test(start_paused = true)]
    async fn abort_all_cancels_running_workers() {
        let (rt_tx, mut rt_rx) = mpsc::channel(8);
        let exec_tx = spawn_executor(rt_tx);

        exec_tx.send(ExecutorRequest::Run(scheduled(0, "A", 100))).await.unwrap();
        exec_tx.send(ExecutorRequest::Run(scheduled(1, "B", 100))).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        exec_tx.send(ExecutorRequest::AbortAll).await.unwrap();

        for _ in 0..2 {
            match rt_rx.recv().await {
                Some(RuntimeEvent::TaskFinished { outcome, .. }) => {
                    assert_eq!(outcome, TaskOutcome::Cancelled);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
    }
}
