use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dagpool::dag::ScheduledTask;
use dagpool::engine::{RuntimeEvent, TaskOutcome};
use dagpool::errors::Result;
use dagpool::exec::ExecutorBackend;

/// A fake executor that:
/// - records which tasks were dispatched, in order
/// - immediately reports `TaskFinished` for each dispatched task, with
///   `Success` unless an outcome was configured via [`FakeExecutor::outcome`].
///
/// The event channel must have room for `max_concurrent` events, since the
/// fake reports completions while the dispatcher is still dispatching.
pub struct FakeExecutor {
    runtime_tx: tokio::sync::mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    outcomes: HashMap<String, TaskOutcome>,
    aborts: Arc<Mutex<usize>>,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: tokio::sync::mpsc::Sender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self {
            runtime_tx,
            executed,
            outcomes: HashMap::new(),
            aborts: Arc::new(Mutex::new(0)),
        }
    }

    /// Report `outcome` instead of `Success` when `task` runs.
    pub fn outcome(mut self, task: &str, outcome: TaskOutcome) -> Self {
        self.outcomes.insert(task.to_string(), outcome);
        self
    }

    /// Number of `abort_running` calls seen so far.
    pub fn abort_counter(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.aborts)
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);

        Box::pin(async move {
            for t in tasks {
                executed.lock().unwrap().push(t.name.clone());

                let outcome = self
                    .outcomes
                    .get(&t.name)
                    .cloned()
                    .unwrap_or(TaskOutcome::Success);

                tx.send(RuntimeEvent::TaskFinished {
                    task: t.name,
                    outcome,
                    elapsed: Duration::ZERO,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }

    fn abort_running(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        *self.aborts.lock().unwrap() += 1;
        Box::pin(async { Ok(()) })
    }
}
