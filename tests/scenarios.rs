// tests/scenarios.rs

mod common;

use std::sync::Arc;
use std::time::Duration;

use dagpool::{DagpoolError, DependencyGraph, TaskOutcome, TaskSpec, schedule};

use crate::common::builders::timed;
use crate::common::{
    ConcurrencyProbe, assert_one_outcome_per_task, assert_respects_dependencies, init_tracing,
    peak_running, with_timeout,
};

fn abc() -> Vec<TaskSpec> {
    vec![
        timed("A", 1000),
        timed("B", 1000).after("A"),
        timed("C", 1000),
    ]
}

#[tokio::test(start_paused = true)]
async fn two_slots_run_independent_roots_concurrently() {
    init_tracing();

    let result = with_timeout(schedule(abc(), 2)).await.unwrap();
    let graph = DependencyGraph::build(abc()).unwrap();

    assert_one_outcome_per_task(&graph, &result);
    assert_respects_dependencies(&graph, &result);
    assert!(result.is_success());

    let a = result.get("A").unwrap();
    let c = result.get("C").unwrap();
    let b = result.get("B").unwrap();

    // A and C both start before either finishes.
    assert!(a.start_tick.unwrap() < c.finish_tick);
    assert!(c.start_tick.unwrap() < a.finish_tick);
    assert!(b.start_tick.unwrap() > a.finish_tick);
    assert_eq!(peak_running(&result), 2);
}

#[tokio::test(start_paused = true)]
async fn single_slot_runs_one_task_at_a_time() {
    init_tracing();

    let start = tokio::time::Instant::now();
    let result = with_timeout(schedule(abc(), 1)).await.unwrap();

    assert_eq!(peak_running(&result), 1);
    let order = result.completion_order();
    assert!(
        order == ["A", "C", "B"] || order == ["C", "A", "B"],
        "unexpected order {order:?}"
    );
    assert!(start.elapsed() >= Duration::from_secs(3));
}

#[tokio::test]
async fn cycle_is_rejected_before_anything_runs() {
    let probe = ConcurrencyProbe::new();
    let specs = vec![
        TaskSpec::new("A", probe.work(Duration::from_millis(1))).after("B"),
        TaskSpec::new("B", probe.work(Duration::from_millis(1))).after("A"),
    ];

    let err = schedule(specs, 2).await.unwrap_err();

    match err {
        DagpoolError::CyclicDependency(msg) => {
            assert!(msg.contains("A") && msg.contains("B"), "{msg}");
        }
        other => panic!("expected CyclicDependency, got {other:?}"),
    }
    assert_eq!(probe.peak(), 0);
}

#[tokio::test]
async fn unknown_dependency_is_rejected() {
    let err = schedule(vec![timed("A", 10).after("Z")], 1)
        .await
        .unwrap_err();

    assert!(
        matches!(err, DagpoolError::UnknownDependency { ref task, ref dependency } if task == "A" && dependency == "Z"),
        "{err:?}"
    );
}

#[tokio::test]
async fn zero_slots_is_invalid_configuration() {
    let err = schedule(abc(), 0).await.unwrap_err();
    assert!(matches!(err, DagpoolError::InvalidConfiguration(_)), "{err:?}");
}

#[tokio::test]
async fn duplicate_names_are_invalid_configuration() {
    let err = schedule(vec![timed("A", 10), timed("A", 20)], 1)
        .await
        .unwrap_err();
    assert!(matches!(err, DagpoolError::InvalidConfiguration(_)), "{err:?}");
}

#[tokio::test]
async fn empty_task_set_yields_empty_result() {
    let result = with_timeout(schedule(Vec::new(), 3)).await.unwrap();
    assert!(result.is_empty());
    assert!(result.is_success());
}

#[tokio::test(start_paused = true)]
async fn wide_fan_out_never_exceeds_slot_limit() {
    init_tracing();

    let probe = ConcurrencyProbe::new();
    let mut specs = vec![TaskSpec::new("root", probe.work(Duration::from_millis(10)))];
    for i in 0..20 {
        specs.push(
            TaskSpec::new(format!("leaf_{i}"), probe.work(Duration::from_millis(50))).after("root"),
        );
    }
    specs.push(
        TaskSpec::new("sink", probe.work(Duration::from_millis(10)))
            .after_all((0..20).map(|i| format!("leaf_{i}"))),
    );

    let graph = Arc::new(DependencyGraph::build(specs.clone()).unwrap());
    let result = with_timeout(schedule(specs, 3)).await.unwrap();

    assert_one_outcome_per_task(&graph, &result);
    assert_respects_dependencies(&graph, &result);
    assert_eq!(probe.peak(), 3);
    assert!(peak_running(&result) <= 3);
    assert_eq!(result.completion_order().last(), Some(&"sink"));
}

#[tokio::test(start_paused = true)]
async fn ready_tasks_start_in_the_order_they_became_ready() {
    let specs = vec![
        timed("A", 10),
        timed("B", 10),
        timed("C", 10),
        timed("D", 10),
    ];

    let result = with_timeout(schedule(specs, 1)).await.unwrap();

    let mut by_start: Vec<_> = result.iter().collect();
    by_start.sort_by_key(|r| r.start_tick);
    let names: Vec<_> = by_start.iter().map(|r| r.task.as_str()).collect();
    assert_eq!(names, ["A", "B", "C", "D"]);
    assert!(result.iter().all(|r| r.outcome == TaskOutcome::Success));
}
