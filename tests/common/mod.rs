#![allow(dead_code)]

pub use dagpool_test_utils::builders;
#[allow(unused_imports)]
pub use dagpool_test_utils::{init_tracing, with_timeout};

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use dagpool::{DependencyGraph, RunResult, Work};

/// Work that sleeps while counting how many probed tasks run at once.
#[derive(Clone, Default)]
pub struct ConcurrencyProbe {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ConcurrencyProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn work(&self, duration: Duration) -> Work {
        let current = Arc::clone(&self.current);
        let peak = Arc::clone(&self.peak);
        Work::from_fn(move || {
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            async move {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(duration).await;
                current.fetch_sub(1, Ordering::SeqCst);
                anyhow::Ok(())
            }
        })
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Every dependency edge `dep -> task` where both sides ran must have
/// `dep` finishing strictly before `task` starts.
pub fn assert_respects_dependencies(graph: &DependencyGraph, result: &RunResult) {
    for task in graph.tasks() {
        let Some(start) = result.get(&task.name).and_then(|r| r.start_tick) else {
            continue;
        };
        for &dep in &task.deps {
            let dep_name = graph.name_of(dep);
            let dep_record = result
                .get(dep_name)
                .unwrap_or_else(|| panic!("no record for {dep_name}"));
            assert!(
                dep_record.finish_tick < start,
                "{} started at tick {start} before {dep_name} finished at tick {}",
                task.name,
                dep_record.finish_tick
            );
        }
    }
}

/// Largest number of tasks that were between their start and finish tick at
/// the same logical instant.
pub fn peak_running(result: &RunResult) -> usize {
    let mut events: Vec<(u64, i32)> = Vec::new();
    for record in result {
        if let Some(start) = record.start_tick {
            events.push((start, 1));
            events.push((record.finish_tick, -1));
        }
    }
    events.sort();

    let mut running = 0i32;
    let mut peak = 0i32;
    for (_, delta) in events {
        running += delta;
        peak = peak.max(running);
    }
    peak as usize
}

/// Each task of `graph` appears exactly once in `result`.
pub fn assert_one_outcome_per_task(graph: &DependencyGraph, result: &RunResult) {
    assert_eq!(result.len(), graph.len());
    for task in graph.tasks() {
        let count = result.iter().filter(|r| r.task == task.name).count();
        assert_eq!(count, 1, "{} has {count} outcomes", task.name);
    }
}
