#![allow(dead_code)]

use std::collections::BTreeMap;
use std::time::Duration;

use dagpool::TaskSpec;
use dagpool::config::{ConfigFile, ConfigSection, DurationSpec, RawConfigFile, TaskConfig};
use dagpool::types::{CancelBehaviour, FailurePolicy};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn max_concurrent(mut self, n: usize) -> Self {
        self.config.config.max_concurrent = n;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.config.failure_policy = policy;
        self
    }

    pub fn cancel_behaviour(mut self, behaviour: CancelBehaviour) -> Self {
        self.config.config.cancel_behaviour = behaviour;
        self
    }

    /// The unvalidated file, for tests that expect validation to fail.
    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    /// Task taking `secs` whole seconds.
    pub fn new(secs: i64) -> Self {
        Self::with_duration(DurationSpec::Seconds(secs))
    }

    /// Task with a duration string such as `"250ms"`.
    pub fn duration_str(s: &str) -> Self {
        Self::with_duration(DurationSpec::Text(s.to_string()))
    }

    fn with_duration(duration: DurationSpec) -> Self {
        Self {
            task: TaskConfig {
                duration,
                dependencies: vec![],
                fail: None,
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.dependencies.push(dep.to_string());
        self
    }

    pub fn fail(mut self, reason: &str) -> Self {
        self.task.fail = Some(reason.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// Timed task taking `millis` milliseconds.
pub fn timed(name: &str, millis: u64) -> TaskSpec {
    TaskSpec::timed(name, Duration::from_millis(millis))
}

/// Timed task that fails with `reason` after `millis` milliseconds.
pub fn failing(name: &str, millis: u64, reason: &str) -> TaskSpec {
    TaskSpec::new(
        name,
        dagpool::Work::SleepThenFail {
            duration: Duration::from_millis(millis),
            reason: reason.to_string(),
        },
    )
}
