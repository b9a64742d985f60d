// src/errors.rs

//! Crate-wide error type and `Result` alias.
//!
//! Build-time problems (bad task definitions, unknown dependencies, cycles)
//! surface here. A task whose work fails is *not* an error: it is recorded as
//! [`TaskOutcome::Failed`](crate::engine::TaskOutcome::Failed) in the run
//! result.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DagpoolError {
    #[error("Unknown dependency: task '{task}' depends on undeclared task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    #[error("Cyclic dependency: {0}")]
    CyclicDependency(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DagpoolError>;
