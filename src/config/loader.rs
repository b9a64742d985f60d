// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Environment variable overriding the default task file location.
pub const CONFIG_ENV_VAR: &str = "DAGPOOL_CONFIG";

/// Load a task file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** check the DAG.
/// Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    debug!(path = %path.display(), "reading task file");
    let contents = fs::read_to_string(path)?;
    load_from_str(&contents)
}

pub fn load_from_str(contents: &str) -> Result<RawConfigFile> {
    Ok(toml::from_str(contents)?)
}

/// Load a task file from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults (`serde` + `Default` impls).
/// - Checks durations, `max_concurrent`, unknown dependencies and cycles.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    ConfigFile::try_from(raw_config)
}

/// `$DAGPOOL_CONFIG` if set, else `Dagpool.toml` in the working directory.
pub fn default_config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("Dagpool.toml"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::errors::DagpoolError;

    #[test]
    fn loads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[task.A]\nduration = \"100ms\"").unwrap();

        let cfg = load_and_validate(file.path()).unwrap();
        assert_eq!(cfg.task.len(), 1);
        assert_eq!(cfg.config.max_concurrent, 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_and_validate(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, DagpoolError::IoError(_)));
    }

    #[test]
    fn malformed_toml_is_toml_error() {
        let err = load_from_str("[task.A\nduration = 1").unwrap_err();
        assert!(matches!(err, DagpoolError::TomlError(_)));
    }
}
