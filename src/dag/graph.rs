// src/dag/graph.rs

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use tracing::{debug, info};

use crate::dag::task::{Task, TaskId, TaskSpec};
use crate::engine::TaskName;
use crate::errors::{DagpoolError, Result};

/// Validated, read-only dependency graph.
///
/// Edge direction is dependency -> dependent: for `B` with
/// `dependencies = ["A"]` the graph holds the edge `A -> B`.
///
/// The graph is never mutated after [`GraphBuilder::build`] returns, so the
/// dispatcher shares it behind an `Arc` for the whole run.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    tasks: Vec<Task>,
    index: HashMap<TaskName, TaskId>,
    graph: DiGraphMap<TaskId, ()>,
    /// Topological order computed at build time (Kahn, insertion-order ties).
    order: Vec<TaskId>,
}

impl DependencyGraph {
    /// Shorthand for `GraphBuilder::new().tasks(specs).build()`.
    pub fn build(specs: impl IntoIterator<Item = TaskSpec>) -> Result<Self> {
        GraphBuilder::new().tasks(specs).build()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// All tasks, in insertion order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: TaskId) -> &Task {
        &self.tasks[id.index()]
    }

    pub fn id_of(&self, name: &str) -> Option<TaskId> {
        self.index.get(name).copied()
    }

    pub fn name_of(&self, id: TaskId) -> &str {
        &self.tasks[id.index()].name
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, id: TaskId) -> &[TaskId] {
        &self.tasks[id.index()].deps
    }

    /// Immediate dependents of a task, in the order they were declared.
    pub fn dependents_of(&self, id: TaskId) -> impl Iterator<Item = TaskId> + '_ {
        self.graph.neighbors_directed(id, Direction::Outgoing)
    }

    /// Number of direct dependencies (the initial unmet count).
    pub fn in_degree(&self, id: TaskId) -> usize {
        self.tasks[id.index()].deps.len()
    }

    /// Every task reachable from `id` through dependent edges, excluding `id`.
    pub fn transitive_dependents(&self, id: TaskId) -> Vec<TaskId> {
        let mut stack: Vec<TaskId> = self.dependents_of(id).collect();
        let mut visited: HashSet<TaskId> = HashSet::new();
        let mut out = Vec::new();

        while let Some(next) = stack.pop() {
            if !visited.insert(next) {
                continue;
            }
            out.push(next);
            stack.extend(self.dependents_of(next));
        }

        out.sort();
        out
    }

    /// Whether `ancestor` must complete before `id` may start.
    pub fn depends_on(&self, id: TaskId, ancestor: TaskId) -> bool {
        self.transitive_dependents(ancestor).contains(&id)
    }

    /// Tasks with no dependencies, in insertion order.
    pub fn roots(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.tasks
            .iter()
            .filter(|t| t.deps.is_empty())
            .map(|t| t.id)
    }

    /// Topological execution order as task names.
    pub fn execution_order(&self) -> Vec<TaskName> {
        self.order
            .iter()
            .map(|id| self.name_of(*id).to_string())
            .collect()
    }

    /// Group tasks by dependency depth: level 0 has no dependencies, level
    /// `n` depends on something in level `n - 1`. Tasks within a level could
    /// run side by side given enough slots.
    pub fn levels(&self) -> Vec<Vec<TaskId>> {
        let mut depth = vec![0usize; self.tasks.len()];
        let mut levels: Vec<Vec<TaskId>> = Vec::new();

        for &id in &self.order {
            let d = self
                .dependencies_of(id)
                .iter()
                .map(|dep| depth[dep.index()] + 1)
                .max()
                .unwrap_or(0);
            depth[id.index()] = d;
            if levels.len() <= d {
                levels.resize_with(d + 1, Vec::new);
            }
            levels[d].push(id);
        }

        levels
    }
}

/// Turns a set of [`TaskSpec`]s into a validated [`DependencyGraph`].
///
/// Validation happens once, here:
/// - empty names, zero durations and duplicate names are
///   [`DagpoolError::InvalidConfiguration`],
/// - dependencies on undeclared tasks are [`DagpoolError::UnknownDependency`],
/// - self-dependencies and longer cycles are [`DagpoolError::CyclicDependency`].
#[derive(Debug, Default)]
pub struct GraphBuilder {
    specs: Vec<TaskSpec>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task(mut self, spec: TaskSpec) -> Self {
        self.specs.push(spec);
        self
    }

    pub fn tasks(mut self, specs: impl IntoIterator<Item = TaskSpec>) -> Self {
        self.specs.extend(specs);
        self
    }

    pub fn build(self) -> Result<DependencyGraph> {
        let index = index_specs(&self.specs)?;
        let tasks = resolve_dependencies(self.specs, &index)?;

        let mut graph: DiGraphMap<TaskId, ()> = DiGraphMap::with_capacity(tasks.len(), 0);
        for task in &tasks {
            graph.add_node(task.id);
        }
        for task in &tasks {
            for &dep in &task.deps {
                graph.add_edge(dep, task.id, ());
            }
        }

        let order = topological_order(&graph, &tasks)?;

        info!(
            task_count = tasks.len(),
            edge_count = graph.edge_count(),
            "dependency graph built"
        );

        Ok(DependencyGraph {
            tasks,
            index,
            graph,
            order,
        })
    }
}

fn index_specs(specs: &[TaskSpec]) -> Result<HashMap<TaskName, TaskId>> {
    let mut index = HashMap::with_capacity(specs.len());

    for (i, spec) in specs.iter().enumerate() {
        if spec.name.trim().is_empty() {
            return Err(DagpoolError::InvalidConfiguration(format!(
                "task #{i} has an empty name"
            )));
        }
        if let Some(d) = spec.work.duration() {
            if d.is_zero() {
                return Err(DagpoolError::InvalidConfiguration(format!(
                    "task '{}' must have a positive duration",
                    spec.name
                )));
            }
        }
        if index.insert(spec.name.clone(), TaskId::new(i)).is_some() {
            return Err(DagpoolError::InvalidConfiguration(format!(
                "duplicate task name '{}'",
                spec.name
            )));
        }
    }

    Ok(index)
}

fn resolve_dependencies(
    specs: Vec<TaskSpec>,
    index: &HashMap<TaskName, TaskId>,
) -> Result<Vec<Task>> {
    let mut tasks = Vec::with_capacity(specs.len());

    for (i, spec) in specs.into_iter().enumerate() {
        let mut deps: Vec<TaskId> = Vec::with_capacity(spec.dependencies.len());

        for dep in &spec.dependencies {
            let Some(&dep_id) = index.get(dep) else {
                return Err(DagpoolError::UnknownDependency {
                    task: spec.name.clone(),
                    dependency: dep.clone(),
                });
            };
            if dep_id.index() == i {
                return Err(DagpoolError::CyclicDependency(format!(
                    "task '{}' depends on itself",
                    spec.name
                )));
            }
            if !deps.contains(&dep_id) {
                deps.push(dep_id);
            } else {
                debug!(task = %spec.name, dep = %dep, "ignoring repeated dependency");
            }
        }

        tasks.push(Task {
            id: TaskId::new(i),
            name: spec.name,
            work: spec.work,
            deps,
        });
    }

    Ok(tasks)
}

/// Kahn's algorithm: repeatedly remove nodes whose in-degree dropped to zero.
///
/// Any node left over sits on (or behind) a cycle; the error names the
/// members of one strongly connected component.
fn topological_order(graph: &DiGraphMap<TaskId, ()>, tasks: &[Task]) -> Result<Vec<TaskId>> {
    let mut in_degree: Vec<usize> = tasks
        .iter()
        .map(|t| graph.neighbors_directed(t.id, Direction::Incoming).count())
        .collect();

    let mut queue: VecDeque<TaskId> = tasks
        .iter()
        .filter(|t| in_degree[t.id.index()] == 0)
        .map(|t| t.id)
        .collect();

    let mut order = Vec::with_capacity(tasks.len());

    while let Some(id) = queue.pop_front() {
        order.push(id);
        for dependent in graph.neighbors_directed(id, Direction::Outgoing) {
            let degree = &mut in_degree[dependent.index()];
            *degree -= 1;
            if *degree == 0 {
                queue.push_back(dependent);
            }
        }
    }

    if order.len() == tasks.len() {
        return Ok(order);
    }

    let members = tarjan_scc(graph)
        .into_iter()
        .find(|scc| scc.len() > 1)
        .map(|mut scc| {
            scc.sort();
            scc.iter()
                .map(|id| tasks[id.index()].name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();

    Err(DagpoolError::CyclicDependency(format!(
        "cycle detected in task DAG involving tasks: {members}"
    )))
}
