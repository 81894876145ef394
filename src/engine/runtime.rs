// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::server::ReloadHandle;

use super::core::WatchCore;
use super::{LoopCommand, LoopEvent};

/// Async shell around [`WatchCore`].
///
/// Reads [`LoopEvent`]s from the watcher, the executor and the Ctrl-C
/// handler, feeds them to the core and carries out the resulting commands.
pub struct WatchLoop<E: ExecutorBackend> {
    core: WatchCore,
    event_rx: mpsc::Receiver<LoopEvent>,
    executor: E,
    reload: ReloadHandle,
}

impl<E: ExecutorBackend> fmt::Debug for WatchLoop<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchLoop")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> WatchLoop<E> {
    pub fn new(
        core: WatchCore,
        event_rx: mpsc::Receiver<LoopEvent>,
        executor: E,
        reload: ReloadHandle,
    ) -> Self {
        Self {
            core,
            event_rx,
            executor,
            reload,
        }
    }

    /// Run until shutdown is requested or every event sender is gone.
    pub async fn run(mut self) -> Result<()> {
        info!("watch loop started");

        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "watch loop received event");

            let step = self.core.step(event);
            for command in step.commands {
                self.execute(command).await?;
            }

            if !step.keep_running {
                info!("shutdown requested; stopping watch loop");
                break;
            }
        }

        info!("watch loop exiting");
        Ok(())
    }

    async fn execute(&mut self, command: LoopCommand) -> Result<()> {
        match command {
            LoopCommand::Dispatch { task, force } => {
                debug!(task = %task, force, "dispatching task");
                self.executor.dispatch(task, force).await
            }
            LoopCommand::Reload => {
                let sessions = self.reload.notify_reload();
                info!(sessions, "reload signal sent");
                Ok(())
            }
        }
    }
}
