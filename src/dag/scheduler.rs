use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::dag::graph::DependencyGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state::SchedulerState;
use crate::dag::task::{ScheduledTask, TaskId, TaskState};
use crate::engine::queue::ReadyQueue;
use crate::engine::result::{RunResult, TaskRecord};
use crate::engine::{DispatchOptions, TaskName, TaskOutcome};
use crate::types::{CancelBehaviour, FailurePolicy};

/// Scheduler holds the immutable DAG plus the mutable state of one run.
///
/// It is responsible for:
/// - seeding the ready queue with dependency-free tasks
/// - handing ready tasks to free worker slots (at most `max_concurrent`)
/// - recording outcomes and releasing dependents of completed tasks
/// - applying the failure policy to dependents of failed tasks
/// - stopping new starts once the run is cancelled
///
/// It never performs IO; the engine feeds it completions and forwards the
/// tasks it schedules to an executor.
#[derive(Debug)]
pub struct Scheduler {
    graph: Arc<DependencyGraph>,
    state: SchedulerState,
    ready: ReadyQueue,
    options: DispatchOptions,
    started_at: Vec<Option<u64>>,
    /// Logical clock; advances on every start and every recorded outcome.
    clock: u64,
    started: bool,
    cancelled: bool,
    finished: bool,
    result: RunResult,
}

impl Scheduler {
    pub fn new(graph: Arc<DependencyGraph>, options: DispatchOptions) -> Self {
        let state = SchedulerState::new(&graph);
        let started_at = vec![None; graph.len()];
        Self {
            graph,
            state,
            ready: ReadyQueue::new(),
            options,
            started_at,
            clock: 0,
            started: false,
            cancelled: false,
            finished: false,
            result: RunResult::default(),
        }
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn options(&self) -> DispatchOptions {
        self.options
    }

    /// Whether every task has a terminal outcome.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn running_count(&self) -> usize {
        self.state.running_count()
    }

    pub fn completed_count(&self) -> usize {
        self.state.completed_count()
    }

    /// Number of ready tasks waiting for a slot.
    pub fn ready_count(&self) -> usize {
        self.ready.len()
    }

    /// Names of currently running tasks.
    pub fn running_tasks(&self) -> Vec<TaskName> {
        self.state
            .running()
            .map(|id| self.graph.name_of(id).to_string())
            .collect()
    }

    pub fn state_of(&self, task: &str) -> Option<TaskState> {
        let id = self.graph.id_of(task)?;
        Some(self.state.state_of(id))
    }

    pub fn result(&self) -> &RunResult {
        &self.result
    }

    pub fn into_result(self) -> RunResult {
        self.result
    }

    /// Start the run (production API).
    pub fn handle_start(&mut self) -> Vec<ScheduledTask> {
        self.start_step_internal().newly_scheduled
    }

    /// Handle completion of a task with a concrete outcome (production API).
    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> Vec<ScheduledTask> {
        self.completion_step_internal(task, outcome, Duration::ZERO)
            .newly_scheduled
    }

    /// Manual-step variant of `handle_start` that returns a rich [`SchedulerStep`].
    pub fn step_start(&mut self) -> SchedulerStep {
        self.start_step_internal()
    }

    /// Manual-step variant of `handle_completion` that returns a rich [`SchedulerStep`].
    pub fn step_completion(
        &mut self,
        task: &str,
        outcome: TaskOutcome,
        elapsed: Duration,
    ) -> SchedulerStep {
        self.completion_step_internal(task, outcome, elapsed)
    }

    /// Cancel the run: no task starts after this call.
    pub fn step_cancel(&mut self) -> SchedulerStep {
        let abort_running = self.cancel_internal();
        let run_just_finished = self.maybe_finish_run();
        SchedulerStep {
            abort_running,
            run_just_finished,
            ..SchedulerStep::default()
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn start_step_internal(&mut self) -> SchedulerStep {
        if self.started || self.finished {
            warn!("scheduler already started or finished; ignoring");
            return SchedulerStep::default();
        }
        self.started = true;

        if self.cancelled {
            return SchedulerStep::default();
        }

        let seeded = self.state.seed();
        info!(
            task_count = self.graph.len(),
            initial_ready = seeded.len(),
            max_concurrent = self.options.max_concurrent,
            "scheduler: starting run"
        );
        self.ready.extend(seeded);

        let newly_scheduled = self.fill_slots();
        let run_just_finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            run_just_finished,
            ..SchedulerStep::default()
        }
    }

    fn completion_step_internal(
        &mut self,
        task: &str,
        outcome: TaskOutcome,
        elapsed: Duration,
    ) -> SchedulerStep {
        let Some(id) = self.graph.id_of(task) else {
            warn!(task = %task, "completion for unknown task; ignoring");
            return SchedulerStep::default();
        };
        if !self.state.is_running(id) {
            warn!(
                task = %task,
                state = ?self.state.state_of(id),
                "completion for task that is not running; ignoring"
            );
            return SchedulerStep::default();
        }

        let release = match &outcome {
            TaskOutcome::Success => true,
            TaskOutcome::Failed(_) => self.options.failure_policy == FailurePolicy::Continue,
            TaskOutcome::BlockedBySourceFailure { .. } | TaskOutcome::Cancelled => false,
        };

        let unblocked = self.state.finish(&self.graph, id, release);
        let finish_tick = self.tick();

        match &outcome {
            TaskOutcome::Failed(cause) => warn!(
                task = %task,
                tick = finish_tick,
                cause = %cause,
                policy = ?self.options.failure_policy,
                "task failed"
            ),
            other => info!(task = %task, tick = finish_tick, outcome = %other, "task finished"),
        }

        self.result.push(TaskRecord {
            task: task.to_string(),
            outcome: outcome.clone(),
            start_tick: self.started_at[id.index()],
            finish_tick,
            elapsed,
        });
        self.ready.extend(unblocked);

        let mut step = SchedulerStep::default();

        if matches!(outcome, TaskOutcome::Failed(_)) {
            match self.options.failure_policy {
                FailurePolicy::Skip => step.newly_blocked = self.block_dependents(id),
                FailurePolicy::Continue => {}
                FailurePolicy::Abort => {
                    warn!(task = %task, "failure policy is abort; cancelling run");
                    step.abort_running = self.cancel_internal();
                }
            }
        }

        step.newly_scheduled = self.fill_slots();
        step.run_just_finished = self.maybe_finish_run();
        step
    }

    /// Record every not-yet-finished transitive dependent of `failed` as
    /// blocked. Returns their names.
    fn block_dependents(&mut self, failed: TaskId) -> Vec<TaskName> {
        let graph = Arc::clone(&self.graph);
        let source = graph.name_of(failed).to_string();
        let mut blocked = Vec::new();

        for dependent in graph.transitive_dependents(failed) {
            if !self.state.retire(dependent) {
                continue;
            }
            let finish_tick = self.tick();
            let name = graph.name_of(dependent).to_string();
            debug!(task = %name, source = %source, "blocked by upstream failure");
            self.result.push(TaskRecord {
                task: name.clone(),
                outcome: TaskOutcome::BlockedBySourceFailure {
                    source: source.clone(),
                },
                start_tick: None,
                finish_tick,
                elapsed: Duration::ZERO,
            });
            blocked.push(name);
        }

        blocked
    }

    /// Mark the run cancelled. Returns whether running tasks must be aborted.
    fn cancel_internal(&mut self) -> bool {
        if self.finished {
            debug!("cancel requested after run finished; ignoring");
            return false;
        }
        if !self.cancelled {
            self.cancelled = true;
            info!(
                running = self.state.running_count(),
                ready = self.ready.len(),
                behaviour = ?self.options.cancel_behaviour,
                "run cancelled; no further tasks will start"
            );
        }
        self.options.cancel_behaviour == CancelBehaviour::Abort && self.state.running_count() > 0
    }

    /// Give free slots to the oldest ready tasks.
    fn fill_slots(&mut self) -> Vec<ScheduledTask> {
        let mut scheduled = Vec::new();

        if self.cancelled {
            return scheduled;
        }

        while self.state.running_count() < self.options.max_concurrent {
            let Some(id) = self.ready.pop() else {
                break;
            };
            if !self.state.start(id) {
                continue;
            }
            let start_tick = self.tick();
            self.started_at[id.index()] = Some(start_tick);

            let task = self.graph.task(id);
            info!(
                task = %task.name,
                tick = start_tick,
                running = self.state.running_count(),
                "starting task"
            );
            scheduled.push(ScheduledTask::from_task(task, start_tick));
        }

        if !self.ready.is_empty() {
            debug!(
                waiting = self.ready.len(),
                "all worker slots busy; ready tasks stay queued"
            );
        }

        scheduled
    }

    /// Finalise a cancelled run once nothing is running, and detect the end
    /// of the run.
    ///
    /// Returns `true` if this call transitioned the run to finished.
    fn maybe_finish_run(&mut self) -> bool {
        if self.finished {
            return false;
        }

        if self.cancelled && self.state.running_count() == 0 {
            self.ready.drain();
            for id in self.state.not_started() {
                self.state.retire(id);
                let finish_tick = self.tick();
                self.result.push(TaskRecord {
                    task: self.graph.name_of(id).to_string(),
                    outcome: TaskOutcome::Cancelled,
                    start_tick: None,
                    finish_tick,
                    elapsed: Duration::ZERO,
                });
            }
        }

        if self.state.all_completed() {
            self.finished = true;
            info!(
                succeeded = self.result.succeeded(),
                failed = self.result.failed(),
                blocked = self.result.blocked(),
                cancelled = self.result.cancelled(),
                "scheduler: all tasks terminal; run finished"
            );
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::task::TaskSpec;

    fn graph(specs: Vec<TaskSpec>) -> Arc<DependencyGraph> {
        Arc::new(DependencyGraph::build(specs).unwrap())
    }

    fn t(name: &str) -> TaskSpec {
        TaskSpec::timed(name, Duration::from_secs(1))
    }

    fn names(tasks: &[ScheduledTask]) -> Vec<&str> {
        tasks.iter().map(|t| t.name.as_str()).collect()
    }

    fn abc() -> Arc<DependencyGraph> {
        graph(vec![t("A"), t("B").after("A"), t("C")])
    }

    fn failed() -> TaskOutcome {
        TaskOutcome::Failed("boom".to_string())
    }

    #[test]
    fn two_slots_start_independent_roots_together() {
        let mut s = Scheduler::new(abc(), DispatchOptions::new(2));

        assert_eq!(names(&s.handle_start()), ["A", "C"]);
        assert_eq!(s.state_of("B"), Some(TaskState::Pending));

        assert_eq!(names(&s.handle_completion("A", TaskOutcome::Success)), ["B"]);
        assert!(s.handle_completion("C", TaskOutcome::Success).is_empty());

        let step = s.step_completion("B", TaskOutcome::Success, Duration::ZERO);
        assert!(step.run_just_finished);
        assert!(s.is_finished());
        assert_eq!(s.result().len(), 3);
        assert!(s.result().is_success());
    }

    #[test]
    fn single_slot_keeps_ready_task_queued() {
        let mut s = Scheduler::new(abc(), DispatchOptions::new(1));

        assert_eq!(names(&s.handle_start()), ["A"]);
        assert_eq!(s.ready_count(), 1);
        assert_eq!(s.state_of("C"), Some(TaskState::Ready));

        // B becomes ready behind C; FIFO order means C goes first.
        assert_eq!(names(&s.handle_completion("A", TaskOutcome::Success)), ["C"]);
        assert_eq!(s.state_of("B"), Some(TaskState::Ready));
        assert_eq!(names(&s.handle_completion("C", TaskOutcome::Success)), ["B"]);
        assert!(s.handle_completion("B", TaskOutcome::Success).is_empty());

        assert_eq!(s.result().completion_order(), ["A", "C", "B"]);
    }

    #[test]
    fn ticks_order_dependent_start_after_dependency_finish() {
        let mut s = Scheduler::new(abc(), DispatchOptions::new(2));
        s.handle_start();
        let b = s.handle_completion("A", TaskOutcome::Success);

        let a_finish = s.result().get("A").unwrap().finish_tick;
        assert!(b[0].start_tick > a_finish);
    }

    #[test]
    fn skip_policy_blocks_transitive_dependents() {
        let g = graph(vec![
            t("A"),
            t("B").after("A"),
            t("C").after("B"),
            t("D"),
        ]);
        let mut s = Scheduler::new(g, DispatchOptions::new(2));
        assert_eq!(names(&s.handle_start()), ["A", "D"]);

        let step = s.step_completion("A", failed(), Duration::ZERO);
        assert_eq!(step.newly_blocked, ["B", "C"]);
        assert!(step.newly_scheduled.is_empty());
        assert!(!step.run_just_finished);

        let step = s.step_completion("D", TaskOutcome::Success, Duration::ZERO);
        assert!(step.run_just_finished);

        let result = s.result();
        assert_eq!(
            result.outcome_of("C"),
            Some(&TaskOutcome::BlockedBySourceFailure {
                source: "A".to_string()
            })
        );
        assert_eq!(result.get("B").unwrap().start_tick, None);
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn continue_policy_runs_dependents_of_failed_task() {
        let opts = DispatchOptions::new(1).with_failure_policy(FailurePolicy::Continue);
        let mut s = Scheduler::new(abc(), opts);
        s.handle_start();

        let step = s.step_completion("A", failed(), Duration::ZERO);
        assert!(step.newly_blocked.is_empty());
        assert_eq!(names(&step.newly_scheduled), ["C"]);
        assert_eq!(names(&s.handle_completion("C", TaskOutcome::Success)), ["B"]);
    }

    #[test]
    fn abort_policy_cancels_unstarted_tasks() {
        let g = graph(vec![t("A"), t("B"), t("C"), t("D").after("A")]);
        let opts = DispatchOptions::new(2).with_failure_policy(FailurePolicy::Abort);
        let mut s = Scheduler::new(g, opts);
        assert_eq!(names(&s.handle_start()), ["A", "B"]);

        let step = s.step_completion("A", failed(), Duration::ZERO);
        assert!(step.newly_scheduled.is_empty());
        assert!(!step.abort_running, "drain behaviour lets B finish");
        assert!(!step.run_just_finished);

        let step = s.step_completion("B", TaskOutcome::Success, Duration::ZERO);
        assert!(step.run_just_finished);
        assert_eq!(s.result().outcome_of("C"), Some(&TaskOutcome::Cancelled));
        assert_eq!(s.result().outcome_of("D"), Some(&TaskOutcome::Cancelled));
        assert_eq!(s.result().len(), 4);
    }

    #[test]
    fn cancel_with_abort_requests_abort_of_running_tasks() {
        let opts = DispatchOptions::new(2).with_cancel_behaviour(CancelBehaviour::Abort);
        let mut s = Scheduler::new(abc(), opts);
        s.handle_start();

        let step = s.step_cancel();
        assert!(step.abort_running);
        assert!(!step.run_just_finished);
        assert!(s.is_cancelled());

        assert!(s.handle_completion("A", TaskOutcome::Cancelled).is_empty());
        let step = s.step_completion("C", TaskOutcome::Cancelled, Duration::ZERO);
        assert!(step.run_just_finished);
        assert_eq!(s.result().cancelled(), 3);
    }

    #[test]
    fn cancel_before_start_cancels_everything() {
        let mut s = Scheduler::new(abc(), DispatchOptions::new(2));
        let step = s.step_cancel();
        assert!(step.run_just_finished);
        assert_eq!(s.result().cancelled(), 3);
        assert!(s.handle_start().is_empty());
    }

    #[test]
    fn stray_completions_are_ignored() {
        let mut s = Scheduler::new(abc(), DispatchOptions::new(2));
        s.handle_start();

        assert!(s.step_completion("nope", TaskOutcome::Success, Duration::ZERO).is_noop());
        assert!(s.step_completion("B", TaskOutcome::Success, Duration::ZERO).is_noop());

        s.handle_completion("A", TaskOutcome::Success);
        assert!(s.step_completion("A", TaskOutcome::Success, Duration::ZERO).is_noop());
        assert_eq!(s.result().len(), 1);
    }

    #[test]
    fn empty_graph_finishes_on_start() {
        let mut s = Scheduler::new(graph(vec![]), DispatchOptions::new(1));
        let step = s.step_start();
        assert!(step.run_just_finished);
        assert!(s.result().is_empty());
    }
}
