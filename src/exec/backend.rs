// src/exec/backend.rs

//! Pluggable executor backend.
//!
//! The watch loop talks to an `ExecutorBackend` instead of a raw mpsc sender,
//! so tests can swap in a fake that records dispatches and answers with
//! `TaskFinished` directly.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::asset::AssetTask;
use crate::engine::{LoopEvent, TaskName};
use crate::errors::{BuildError, Result};

use super::executor::{Dispatch, spawn_executor};

pub trait ExecutorBackend: Send {
    /// Start one run of `task`. Completion is reported asynchronously as
    /// [`LoopEvent::TaskFinished`].
    fn dispatch(
        &mut self,
        task: TaskName,
        force: bool,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend: runs [`AssetTask`]s on the background executor loop.
pub struct AssetExecutor {
    tx: mpsc::Sender<Dispatch>,
}

impl AssetExecutor {
    /// Spawn the executor loop over `tasks`, reporting completions to
    /// `loop_tx`.
    pub fn new(tasks: HashMap<TaskName, Arc<AssetTask>>, loop_tx: mpsc::Sender<LoopEvent>) -> Self {
        Self {
            tx: spawn_executor(tasks, loop_tx),
        }
    }
}

impl ExecutorBackend for AssetExecutor {
    fn dispatch(
        &mut self,
        task: TaskName,
        force: bool,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();

        Box::pin(async move {
            tx.send(Dispatch { task, force })
                .await
                .map_err(|e| BuildError::Runtime(format!("executor loop closed: {e}")))
        })
    }
}
