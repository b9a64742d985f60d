// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::dag::{DependencyGraph, GraphBuilder};
use crate::errors::{DagpoolError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = DagpoolError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let graph = validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.task, graph))
    }
}

/// Check a raw task file and build its dependency graph.
///
/// Checks run in order: at least one task, global settings, per-task
/// durations, then graph-level checks (unknown dependencies, cycles).
pub fn validate_config(cfg: &RawConfigFile) -> Result<DependencyGraph> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    build_graph(cfg)
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(DagpoolError::InvalidConfiguration(
            "task file must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.max_concurrent == 0 {
        return Err(DagpoolError::InvalidConfiguration(
            "[config].max_concurrent must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn build_graph(cfg: &RawConfigFile) -> Result<DependencyGraph> {
    let specs = cfg
        .task
        .iter()
        .map(|(name, task)| task.to_spec(name))
        .collect::<Result<Vec<_>>>()?;

    GraphBuilder::new().tasks(specs).build()
}
