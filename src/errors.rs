// src/errors.rs

//! Crate-wide error taxonomy.
//!
//! - [`BuildError::Config`] is fatal and raised before any file I/O.
//! - [`BuildError::Transform`] and [`BuildError::Io`] are recorded per file in
//!   a task report and never abort sibling files.
//! - [`BuildError::TaskFailed`] is raised by the task graph when a task in the
//!   requested chain finished with per-file failures.
//! - [`BuildError::Runtime`] covers channel and worker failures in the engine.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("{}: step '{step}' failed: {message}", .path.display())]
    Transform {
        step: String,
        path: PathBuf,
        message: String,
    },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("task '{task}' reported {failures} failed file(s) (chain: {chain})")]
    TaskFailed {
        task: String,
        chain: String,
        failures: usize,
    },

    /// Internal failure of the async machinery (closed channel, panicked
    /// worker).
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl BuildError {
    pub fn config(msg: impl Into<String>) -> Self {
        BuildError::Config(msg.into())
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// True for errors that must stop the process before any work happens.
    pub fn is_config(&self) -> bool {
        matches!(self, BuildError::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
