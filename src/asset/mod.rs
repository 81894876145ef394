// src/asset/mod.rs

//! Per-class asset tasks.
//!
//! - [`staleness`] decides whether a destination must be rebuilt, using file
//!   modification times as the only ledger.
//! - [`task`] walks a source tree and drives files through their pipeline.
//! - [`report`] holds per-file outcomes.
//! - [`write`] publishes outputs atomically.

pub mod report;
pub mod staleness;
pub mod task;
pub mod write;

pub use report::{FileReport, FileStatus, TaskReport};
pub use staleness::{AssetRule, ExtensionRewrite, is_stale};
pub use task::{AssetTask, Route};
pub use write::write_atomic;
