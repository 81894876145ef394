// src/watch/mod.rs

//! File watching and change routing.
//!
//! This module is responsible for:
//! - Compiling the static routing rules from the configured source roots.
//! - Wiring up a cross-platform filesystem watcher (`notify`) and turning
//!   its events into [`ChangeEvent`]s.
//!
//! It does **not** run tasks; the watch loop in [`crate::engine`] decides
//! what to dispatch.

pub mod patterns;
pub mod watcher;

use std::path::PathBuf;
use std::time::SystemTime;

pub use patterns::{RoutingTable, WatchRoute};
pub use watcher::{WatchTarget, WatcherHandle, spawn_watcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

/// One changed path, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub timestamp: SystemTime,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
            timestamp: SystemTime::now(),
        }
    }

    /// Path with `/` separators, as matched by [`RoutingTable`].
    pub fn rel_path(&self) -> String {
        self.path.to_string_lossy().replace('\\', "/")
    }
}
