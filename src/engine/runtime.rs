// src/engine/runtime.rs

use std::fmt;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::ScheduledTask;
use crate::errors::{DagpoolError, Result};
use crate::exec::ExecutorBackend;

use super::core::CoreRuntime;
use super::result::RunResult;
use super::{CoreCommand, CoreStep, RuntimeEvent};

/// Drives the scheduler in response to `RuntimeEvent`s and delegates the
/// actual work to an `ExecutorBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// scheduling semantics. Between events the dispatcher is parked on the
/// completion channel; it never polls.
pub struct Dispatcher<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Dispatcher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Dispatcher<E> {
    /// `event_rx` must be the receiving end of the channel the executor
    /// reports completions on.
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
        }
    }

    /// Main event loop.
    ///
    /// - Starts the run and dispatches the initial ready tasks.
    /// - Consumes `RuntimeEvent`s from `event_rx`.
    /// - Feeds them into the core runtime.
    /// - Executes commands returned by the core (dispatch, abort, exit).
    ///
    /// Returns once every task has an outcome. Task failures never surface
    /// as `Err`; only a broken executor or event channel does.
    pub async fn run(mut self) -> Result<RunResult> {
        info!("dispatcher started");

        let step = self.core.start();
        let mut keep_running = self.apply(step).await?;

        while keep_running {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    let running = self.core.scheduler().running_tasks();
                    return Err(DagpoolError::Other(anyhow!(
                        "event channel closed while tasks were still running: {running:?}"
                    )));
                }
            };

            debug!(?event, "dispatcher received event");

            let step = self.core.step(event);
            keep_running = self.apply(step).await?;
        }

        info!("dispatcher exiting");
        Ok(self.core.into_result())
    }

    /// Execute the commands of one core step. Returns whether to keep going.
    async fn apply(&mut self, step: CoreStep) -> Result<bool> {
        for command in step.commands {
            self.execute_command(command).await?;
        }
        if !step.keep_running {
            info!("core requested exit; stopping dispatcher");
        }
        Ok(step.keep_running)
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchTasks(tasks) => {
                self.spawn_ready(tasks).await?;
            }
            CoreCommand::AbortRunning => {
                info!("aborting running tasks");
                self.executor.abort_running().await?;
            }
            CoreCommand::RequestExit => {
                debug!("core issued RequestExit command");
            }
        }
        Ok(())
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        let ticks: Vec<_> = tasks.iter().map(|t| t.start_tick).collect();
        debug!(?names, ?ticks, "dispatching ready tasks");

        self.executor.spawn_ready_tasks(tasks).await
    }
}

/// Requests cancellation of a running dispatch.
///
/// After cancellation no further task starts. Whether running tasks finish
/// or are aborted is decided by the run's `CancelBehaviour`.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: mpsc::Sender<RuntimeEvent>,
}

impl CancelHandle {
    pub fn new(tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self { tx }
    }

    /// Returns `false` if the dispatcher already exited.
    pub async fn cancel(&self) -> bool {
        self.tx.send(RuntimeEvent::CancelRequested).await.is_ok()
    }
}
