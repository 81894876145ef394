// src/dag/mod.rs

//! Task dependency graph.
//!
//! Tasks are declared once at startup (see [`crate::tasks`]). Running a task
//! resolves its dependencies depth-first and executes them level by level
//! before the task itself.

pub mod graph;

pub use graph::{GraphReport, Resolution, TaskAction, TaskGraph, TaskNode};
