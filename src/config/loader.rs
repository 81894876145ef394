// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::BuildConfig;
use crate::config::validate::validate_config;
use crate::errors::{BuildError, Result};
use crate::pipeline::StepRegistry;

/// Load a configuration file and return the raw `BuildConfig`.
///
/// This only performs TOML deserialization and sets [`BuildConfig::root`];
/// use [`load_and_validate`] for semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<BuildConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;

    let mut config: BuildConfig = toml::from_str(&contents).map_err(|e| {
        BuildError::config(format!("parsing TOML config from {}: {e}", path.display()))
    })?;
    config.root = config_root_dir(path);

    Ok(config)
}

/// Load a configuration file and validate it against the registered steps.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks required paths, pipeline step names and serve options.
pub fn load_and_validate(path: impl AsRef<Path>, registry: &StepRegistry) -> Result<BuildConfig> {
    let config = load_from_path(&path)?;
    validate_config(&config, registry)?;
    Ok(config)
}

/// Default config location: `Assetpipe.toml` in the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Assetpipe.toml")
}

/// Directory containing the config file, or the working directory for a bare
/// file name.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
