// src/exec/mod.rs

//! Task execution layer.
//!
//! This module is responsible for actually running each task's unit of work
//! and reporting back to the dispatcher via `RuntimeEvent`s.
//!
//! - [`executor_loop`] owns the loop which spawns one worker per scheduled
//!   task and can abort them.
//! - [`task_runner`] runs a single task's work and converts errors and
//!   panics into outcomes.
//! - [`backend`] provides the `ExecutorBackend` trait and a concrete
//!   `RealExecutorBackend` that the dispatcher uses in production, and which
//!   tests can replace with a fake implementation.

pub mod backend;
pub mod executor_loop;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::{spawn_executor, ExecutorRequest};
