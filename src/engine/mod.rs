// src/engine/mod.rs

//! Watch-mode orchestration.
//!
//! This module ties together:
//! - the per-task coalescing queue ([`queue`])
//! - the pure state machine that routes changes and decides what to run
//!   ([`core`])
//! - the async event loop that executes those decisions ([`runtime`])

use crate::watch::ChangeEvent;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Events flowing into the watch loop.
#[derive(Debug, Clone)]
pub enum LoopEvent {
    /// A watched source path changed.
    Change(ChangeEvent),
    /// A dispatched task run finished. `ok` is false if any file failed.
    TaskFinished { task: TaskName, ok: bool },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    Shutdown,
}

/// Side effects requested by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopCommand {
    Dispatch { task: TaskName, force: bool },
    Reload,
}

pub mod core;
pub mod queue;
pub mod runtime;

pub use core::{CoreStep, WatchCore};
pub use queue::{DispatchQueue, DispatchState};
pub use runtime::WatchLoop;
