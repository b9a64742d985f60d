// src/config/model.rs

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::dag::{DependencyGraph, TaskSpec, Work};
use crate::engine::DispatchOptions;
use crate::errors::{DagpoolError, Result};
use crate::types::{CancelBehaviour, FailurePolicy};

/// Top-level task file as read from TOML, before validation.
///
/// ```toml
/// [config]
/// max_concurrent = 2
/// failure_policy = "skip"
///
/// [task.A]
/// duration = 1
///
/// [task.B]
/// duration = "500ms"
/// dependencies = ["A"]
/// ```
///
/// Use `ConfigFile::try_from` (or `config::load_and_validate`) to obtain a
/// validated [`ConfigFile`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global dispatch settings from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Maximum number of tasks running at once. Must be >= 1.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// `"skip"` (default), `"continue"` or `"abort"`.
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// `"drain"` (default) or `"abort"`.
    #[serde(default)]
    pub cancel_behaviour: CancelBehaviour,
}

fn default_max_concurrent() -> usize {
    1
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            failure_policy: FailurePolicy::default(),
            cancel_behaviour: CancelBehaviour::default(),
        }
    }
}

impl ConfigSection {
    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions::new(self.max_concurrent)
            .with_failure_policy(self.failure_policy)
            .with_cancel_behaviour(self.cancel_behaviour)
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// How long the simulated workload takes: whole seconds, or a string
    /// such as `"250ms"`, `"3s"`, `"1m"`.
    pub duration: DurationSpec,

    /// Tasks that must complete before this one starts.
    #[serde(default, alias = "after")]
    pub dependencies: Vec<String>,

    /// If set, the simulated workload fails with this message after its
    /// duration.
    #[serde(default)]
    pub fail: Option<String>,
}

impl TaskConfig {
    /// Convert into a [`TaskSpec`] with a simulated, timed workload.
    pub fn to_spec(&self, name: &str) -> Result<TaskSpec> {
        let duration = self.duration.to_duration().map_err(|e| {
            DagpoolError::InvalidConfiguration(format!("task '{name}': {e}"))
        })?;

        let work = match &self.fail {
            Some(reason) => Work::SleepThenFail {
                duration,
                reason: reason.clone(),
            },
            None => Work::Sleep(duration),
        };

        Ok(TaskSpec::new(name, work).after_all(self.dependencies.iter().cloned()))
    }
}

/// `duration = 3` or `duration = "3s"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DurationSpec {
    Seconds(i64),
    Text(String),
}

impl DurationSpec {
    /// Resolve to a strictly positive duration.
    pub fn to_duration(&self) -> std::result::Result<Duration, String> {
        let duration = match self {
            DurationSpec::Seconds(secs) if *secs <= 0 => {
                return Err(format!("duration must be positive (got {secs})"));
            }
            DurationSpec::Seconds(secs) => Duration::from_secs(secs.unsigned_abs()),
            DurationSpec::Text(s) => parse_duration(s)?,
        };

        if duration.is_zero() {
            return Err("duration must be positive (got 0)".to_string());
        }
        Ok(duration)
    }
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
/// A bare number is taken as seconds.
fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration too large: '{s}'"))
}

/// Validated task file.
///
/// Holding a `ConfigFile` guarantees that every dependency resolves, the
/// graph is acyclic, durations are positive and `max_concurrent >= 1`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub task: BTreeMap<String, TaskConfig>,
    graph: Arc<DependencyGraph>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        task: BTreeMap<String, TaskConfig>,
        graph: DependencyGraph,
    ) -> Self {
        Self {
            config,
            task,
            graph: Arc::new(graph),
        }
    }

    /// The dependency graph built from `[task.*]`.
    pub fn graph(&self) -> Arc<DependencyGraph> {
        Arc::clone(&self.graph)
    }

    pub fn dispatch_options(&self) -> DispatchOptions {
        self.config.dispatch_options()
    }
}
