// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::sync::Arc;

use anyhow::{anyhow, bail};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::{default_config_path, load_and_validate};
use crate::config::model::ConfigFile;
use crate::exec::{ExecutorBackend, RealExecutorBackend};

pub use crate::dag::{DependencyGraph, GraphBuilder, Scheduler, TaskSpec, Work};
pub use crate::engine::{
    CancelHandle, CoreRuntime, DispatchOptions, Dispatcher, RunResult, RuntimeEvent, TaskOutcome,
    TaskRecord,
};
pub use crate::errors::{DagpoolError, Result};
pub use crate::types::{CancelBehaviour, FailurePolicy};

/// Capacity of the completion/cancel channel feeding the dispatcher.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Build a graph from `specs` and run it with at most `max_concurrent`
/// tasks in flight, using the default failure policy.
///
/// Build-time problems (invalid `max_concurrent`, bad task definitions,
/// unknown dependencies, cycles) are returned before any task starts. Task
/// failures are not errors; they show up in the returned [`RunResult`].
pub async fn schedule(
    specs: impl IntoIterator<Item = TaskSpec>,
    max_concurrent: usize,
) -> Result<RunResult> {
    schedule_with_options(specs, DispatchOptions::new(max_concurrent)).await
}

/// Like [`schedule`], with explicit failure and cancel policies.
pub async fn schedule_with_options(
    specs: impl IntoIterator<Item = TaskSpec>,
    options: DispatchOptions,
) -> Result<RunResult> {
    options.validate()?;
    let graph = GraphBuilder::new().tasks(specs).build()?;
    spawn_run(Arc::new(graph), options)?.wait().await
}

/// Run an already-validated graph on a caller-supplied executor backend.
///
/// `events` must be the receiving end of the channel `backend` reports
/// `RuntimeEvent::TaskFinished` on.
pub async fn schedule_with<E: ExecutorBackend>(
    graph: Arc<DependencyGraph>,
    options: DispatchOptions,
    backend: E,
    events: mpsc::Receiver<RuntimeEvent>,
) -> Result<RunResult> {
    options.validate()?;
    let core = CoreRuntime::new(Scheduler::new(graph, options));
    Dispatcher::new(core, events, backend).run().await
}

/// A dispatch running in the background.
#[derive(Debug)]
pub struct RunHandle {
    cancel: CancelHandle,
    join: JoinHandle<Result<RunResult>>,
}

impl RunHandle {
    /// Handle that stops further tasks from starting.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Wait for the run to finish.
    pub async fn wait(self) -> Result<RunResult> {
        match self.join.await {
            Ok(result) => result,
            Err(e) => Err(DagpoolError::Other(anyhow!("dispatcher task failed: {e}"))),
        }
    }
}

/// Start a run on the real executor and return immediately.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_run(graph: Arc<DependencyGraph>, options: DispatchOptions) -> Result<RunHandle> {
    options.validate()?;

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(EVENT_CHANNEL_CAPACITY);
    let executor = RealExecutorBackend::new(rt_tx.clone());
    let cancel = CancelHandle::new(rt_tx);

    let core = CoreRuntime::new(Scheduler::new(graph, options));
    let dispatcher = Dispatcher::new(core, rt_rx, executor);
    let join = tokio::spawn(dispatcher.run());

    Ok(RunHandle { cancel, join })
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - task file loading and CLI overrides
/// - scheduler / dispatcher / executor
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> anyhow::Result<()> {
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let cfg = load_and_validate(&config_path)?;

    let mut options = cfg.dispatch_options();
    if let Some(max) = args.max_concurrent {
        options.max_concurrent = max;
    }
    if let Some(policy) = args.failure_policy {
        options.failure_policy = policy;
    }
    options.validate()?;

    let graph = cfg.graph();
    println!("execution order: {}", graph.execution_order().join(" -> "));

    if args.dry_run {
        print_dry_run(&cfg, &graph, options);
        return Ok(());
    }

    info!(
        tasks = graph.len(),
        max_concurrent = options.max_concurrent,
        failure_policy = ?options.failure_policy,
        "starting run"
    );

    let handle = spawn_run(graph, options)?;

    // Ctrl-C → stop starting new tasks.
    {
        let cancel = handle.cancel_handle();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            warn!("Ctrl+C received; cancelling run");
            if !cancel.cancel().await {
                debug!("run already finished");
            }
        });
    }

    let result = handle.wait().await?;
    print_summary(&result);

    if !result.is_success() {
        bail!(
            "{} failed, {} blocked, {} cancelled",
            result.failed(),
            result.blocked(),
            result.cancelled()
        );
    }
    Ok(())
}

fn print_summary(result: &RunResult) {
    println!();
    println!("results ({} tasks):", result.len());
    for record in result {
        let start = record
            .start_tick
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<20} {:<40} start={:<4} finish={:<4} {:?}",
            record.task, record.outcome, start, record.finish_tick, record.elapsed
        );
    }
    println!(
        "{} succeeded, {} failed, {} blocked, {} cancelled",
        result.succeeded(),
        result.failed(),
        result.blocked(),
        result.cancelled()
    );
}

/// Dry-run output: settings, tasks and dependency levels.
fn print_dry_run(cfg: &ConfigFile, graph: &DependencyGraph, options: DispatchOptions) {
    println!("dagpool dry-run");
    println!("  max_concurrent = {}", options.max_concurrent);
    println!("  failure_policy = {:?}", options.failure_policy);
    println!("  cancel_behaviour = {:?}", options.cancel_behaviour);
    println!();

    println!("tasks ({}):", graph.len());
    for task in graph.tasks() {
        println!("  - {}", task.name);
        if let Some(d) = task.work.duration() {
            println!("      duration: {d:?}");
        }
        if let Some(fail) = cfg.task.get(&task.name).and_then(|t| t.fail.as_ref()) {
            println!("      fails with: {fail}");
        }
        if !task.deps.is_empty() {
            let deps: Vec<_> = task.deps.iter().map(|&d| graph.name_of(d)).collect();
            println!("      dependencies: {deps:?}");
        }
    }

    println!();
    println!("levels:");
    for (depth, level) in graph.levels().iter().enumerate() {
        let names: Vec<_> = level.iter().map(|&id| graph.name_of(id)).collect();
        println!("  {depth}: {}", names.join(", "));
    }

    debug!("dry-run complete (no execution)");
}
