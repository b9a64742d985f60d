// src/engine/mod.rs

//! Dispatch engine for dagpool.
//!
//! This module ties together:
//! - the DAG scheduler (readiness, slot accounting, failure policy)
//! - the ready queue
//! - the dispatcher event loop that reacts to:
//!   - task completion events from workers
//!   - cancellation requests
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::fmt;
use std::time::Duration;

use crate::errors::{DagpoolError, Result};
use crate::types::{CancelBehaviour, FailurePolicy};

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Terminal outcome of a task within one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// The task's work returned an error or panicked.
    Failed(String),
    /// Never ran because `source` (a direct or transitive dependency) failed.
    BlockedBySourceFailure { source: TaskName },
    /// Aborted while running, or never started because the run was cancelled.
    Cancelled,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success)
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutcome::Success => f.write_str("success"),
            TaskOutcome::Failed(cause) => write!(f, "failed: {cause}"),
            TaskOutcome::BlockedBySourceFailure { source } => {
                write!(f, "blocked by failure of '{source}'")
            }
            TaskOutcome::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Options for one dispatch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Maximum number of tasks running at the same time (>= 1).
    pub max_concurrent: usize,
    pub failure_policy: FailurePolicy,
    pub cancel_behaviour: CancelBehaviour,
}

impl DispatchOptions {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent,
            ..Self::default()
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_cancel_behaviour(mut self, behaviour: CancelBehaviour) -> Self {
        self.cancel_behaviour = behaviour;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == 0 {
            return Err(DagpoolError::InvalidConfiguration(
                "max_concurrent must be >= 1 (got 0)".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            max_concurrent: 1,
            failure_policy: FailurePolicy::default(),
            cancel_behaviour: CancelBehaviour::default(),
        }
    }
}

/// Events flowing into the dispatcher from workers and cancel handles.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A worker finished running a task.
    TaskFinished {
        task: TaskName,
        outcome: TaskOutcome,
        elapsed: Duration,
    },
    /// Stop starting new tasks (see [`CancelBehaviour`]).
    CancelRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod result;
pub mod runtime;

pub use self::core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::ReadyQueue;
pub use result::{RunResult, TaskRecord};
pub use runtime::{CancelHandle, Dispatcher};
