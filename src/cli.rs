// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::FailurePolicy;

/// Command-line arguments for `dagpool`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dagpool",
    version,
    about = "Run a DAG of timed tasks on a bounded worker pool.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the task file (TOML).
    ///
    /// Default: `$DAGPOOL_CONFIG`, else `Dagpool.toml` in the current
    /// working directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override `[config].max_concurrent`.
    #[arg(long, value_name = "N")]
    pub max_concurrent: Option<usize>,

    /// Override `[config].failure_policy` (skip, continue, abort).
    #[arg(long, value_name = "POLICY")]
    pub failure_policy: Option<FailurePolicy>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DAGPOOL_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print execution order and levels, but don't run
    /// anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overrides() {
        let args = CliArgs::try_parse_from([
            "dagpool",
            "--config",
            "jobs.toml",
            "--max-concurrent",
            "4",
            "--failure-policy",
            "continue",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(args.config, Some(PathBuf::from("jobs.toml")));
        assert_eq!(args.max_concurrent, Some(4));
        assert_eq!(args.failure_policy, Some(FailurePolicy::Continue));
        assert!(args.dry_run);
    }

    #[test]
    fn rejects_unknown_policy() {
        assert!(CliArgs::try_parse_from(["dagpool", "--failure-policy", "retry"]).is_err());
    }
}
