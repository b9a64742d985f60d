// src/dag/task.rs

//! Task definitions: the caller-facing [`TaskSpec`] and the validated
//! [`Task`] stored inside a [`DependencyGraph`](crate::dag::DependencyGraph).

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::TaskName;

/// Future produced by a custom work function.
pub type WorkFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

type WorkFn = Arc<dyn Fn() -> WorkFuture + Send + Sync + 'static>;

/// Dense identifier of a task inside one graph.
///
/// Ids are assigned in insertion order, which is also the tie-break order
/// used when several tasks become ready at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(usize);

impl TaskId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The opaque unit of work a task performs.
#[derive(Clone)]
pub enum Work {
    /// Simulated workload: wait for the given duration, then succeed.
    Sleep(Duration),
    /// Simulated workload that fails with `reason` after waiting.
    SleepThenFail { duration: Duration, reason: String },
    /// Caller-supplied async work.
    Custom(WorkFn),
}

impl Work {
    pub fn sleep(duration: Duration) -> Self {
        Work::Sleep(duration)
    }

    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Work::Custom(Arc::new(move || Box::pin(f()) as WorkFuture))
    }

    /// Declared duration of a simulated workload, if any.
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Work::Sleep(d) => Some(*d),
            Work::SleepThenFail { duration, .. } => Some(*duration),
            Work::Custom(_) => None,
        }
    }

    /// Produce the future that performs this work once.
    pub fn execute(&self) -> WorkFuture {
        match self {
            Work::Sleep(d) => {
                let d = *d;
                Box::pin(async move {
                    tokio::time::sleep(d).await;
                    Ok(())
                })
            }
            Work::SleepThenFail { duration, reason } => {
                let d = *duration;
                let reason = reason.clone();
                Box::pin(async move {
                    tokio::time::sleep(d).await;
                    Err(anyhow::anyhow!(reason))
                })
            }
            Work::Custom(f) => f(),
        }
    }
}

impl fmt::Debug for Work {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Work::Sleep(d) => f.debug_tuple("Sleep").field(d).finish(),
            Work::SleepThenFail { duration, reason } => f
                .debug_struct("SleepThenFail")
                .field("duration", duration)
                .field("reason", reason)
                .finish(),
            Work::Custom(_) => f.write_str("Custom(<fn>)"),
        }
    }
}

/// Caller-facing task definition, validated by
/// [`GraphBuilder`](crate::dag::GraphBuilder).
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub name: TaskName,
    pub work: Work,
    /// Names of tasks that must complete before this one starts.
    pub dependencies: Vec<TaskName>,
}

impl TaskSpec {
    pub fn new(name: impl Into<TaskName>, work: Work) -> Self {
        Self {
            name: name.into(),
            work,
            dependencies: Vec::new(),
        }
    }

    /// Timed task that sleeps for `duration`.
    pub fn timed(name: impl Into<TaskName>, duration: Duration) -> Self {
        Self::new(name, Work::Sleep(duration))
    }

    pub fn after(mut self, dep: impl Into<TaskName>) -> Self {
        self.dependencies.push(dep.into());
        self
    }

    pub fn after_all<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        self.dependencies.extend(deps.into_iter().map(Into::into));
        self
    }
}

/// Validated task stored in the graph.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub name: TaskName,
    pub work: Work,
    /// Direct dependencies, de-duplicated, in declaration order.
    pub deps: Vec<TaskId>,
}

/// Per-task scheduling state within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting on at least one dependency.
    Pending,
    /// All dependencies completed; waiting for a free worker slot.
    Ready,
    /// Dispatched to a worker.
    Running,
    /// Has a terminal outcome (success, failure, blocked or cancelled).
    Completed,
}

/// Description of a task the dispatcher wants a worker to run now.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub id: TaskId,
    pub name: TaskName,
    pub work: Work,
    /// Logical clock value at which the task was started.
    pub start_tick: u64,
}

impl ScheduledTask {
    pub fn from_task(task: &Task, start_tick: u64) -> Self {
        Self {
            id: task.id,
            name: task.name.clone(),
            work: task.work.clone(),
            start_tick,
        }
    }
}
