// src/dag/mod.rs

//! DAG representation and scheduling.
//!
//! - [`task`] defines task specs, validated tasks and the unit of work.
//! - [`graph`] holds the validated dependency graph and its builder.
//! - [`readiness`] tracks unmet dependencies and releases ready tasks.
//! - [`state`] manages per-run state transitions.
//! - [`scheduler`] contains the per-run state machine that decides which
//!   tasks start, and what happens to dependents when a task finishes.
//! - [`scheduler_step`] defines the result type for scheduler steps.

pub mod graph;
pub mod readiness;
pub mod scheduler;
pub mod scheduler_step;
pub mod state;
pub mod task;

pub use graph::{DependencyGraph, GraphBuilder};
pub use readiness::ReadinessTracker;
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use state::SchedulerState;
pub use task::{ScheduledTask, Task, TaskId, TaskSpec, TaskState, Work, WorkFuture};
