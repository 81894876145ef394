// src/exec/mod.rs

//! Task execution layer for watch mode.
//!
//! - [`executor`] owns the background loop that runs asset tasks and reports
//!   completions back to the watch loop.
//! - [`backend`] provides the `ExecutorBackend` trait and the production
//!   `AssetExecutor`, which tests can replace with a fake.

pub mod backend;
pub mod executor;

pub use backend::{AssetExecutor, ExecutorBackend};
pub use executor::{Dispatch, spawn_executor};
