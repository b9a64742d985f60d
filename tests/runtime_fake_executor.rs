// tests/runtime_fake_executor.rs

mod common;

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use dagpool::config::ConfigFile;
use dagpool::engine::{RuntimeEvent, TaskOutcome};
use dagpool::{DispatchOptions, FailurePolicy, schedule_with};
use dagpool_test_utils::fake_executor::FakeExecutor;

use crate::common::builders::{ConfigFileBuilder, TaskConfigBuilder};
use crate::common::{init_tracing, with_timeout};

/// A -> B -> C, plus an independent D.
fn chain_config() -> ConfigFile {
    ConfigFileBuilder::new()
        .with_task("A", TaskConfigBuilder::new(1).build())
        .with_task("B", TaskConfigBuilder::new(1).after("A").build())
        .with_task("C", TaskConfigBuilder::new(1).after("B").build())
        .with_task("D", TaskConfigBuilder::new(1).build())
        .build()
}

#[tokio::test]
async fn dispatcher_with_fake_executor_runs_chain_in_order() {
    init_tracing();

    let cfg = chain_config();
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx, executed.clone());

    let result = with_timeout(schedule_with(
        cfg.graph(),
        DispatchOptions::new(1),
        executor,
        rt_rx,
    ))
    .await
    .unwrap();

    assert_eq!(*executed.lock().unwrap(), ["A", "D", "B", "C"]);
    assert_eq!(result.completion_order(), ["A", "D", "B", "C"]);
    assert!(result.is_success());
}

#[tokio::test]
async fn fake_failure_blocks_dependents_without_dispatching_them() {
    let cfg = chain_config();
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx, executed.clone())
        .outcome("A", TaskOutcome::Failed("nope".to_string()));

    let result = with_timeout(schedule_with(
        cfg.graph(),
        DispatchOptions::new(2),
        executor,
        rt_rx,
    ))
    .await
    .unwrap();

    let executed = executed.lock().unwrap().clone();
    assert!(!executed.contains(&"B".to_string()));
    assert!(!executed.contains(&"C".to_string()));
    assert_eq!(result.blocked(), 2);
    assert_eq!(result.outcome_of("D"), Some(&TaskOutcome::Success));
}

#[tokio::test]
async fn fake_failure_with_abort_policy_cancels_unstarted() {
    let cfg = chain_config();
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx, executed.clone())
        .outcome("A", TaskOutcome::Failed("nope".to_string()));
    let aborts = executor.abort_counter();

    let options = DispatchOptions::new(1).with_failure_policy(FailurePolicy::Abort);
    let result = with_timeout(schedule_with(cfg.graph(), options, executor, rt_rx))
        .await
        .unwrap();

    assert_eq!(*executed.lock().unwrap(), ["A"]);
    assert_eq!(result.cancelled(), 3);
    // Drain is the default cancel behaviour, so nothing gets aborted.
    assert_eq!(*aborts.lock().unwrap(), 0);
}
