// src/exec/executor.rs

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::asset::AssetTask;
use crate::engine::{LoopEvent, TaskName};

/// Request to run one asset task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub task: TaskName,
    pub force: bool,
}

/// Spawn the background executor loop.
///
/// Each dispatch runs in its own Tokio task and reports back with
/// [`LoopEvent::TaskFinished`]. The loop does not serialize runs itself; the
/// watch loop's dispatch queue never sends a task that is still running.
pub fn spawn_executor(
    tasks: HashMap<TaskName, Arc<AssetTask>>,
    loop_tx: mpsc::Sender<LoopEvent>,
) -> mpsc::Sender<Dispatch> {
    let (tx, mut rx) = mpsc::channel::<Dispatch>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        while let Some(Dispatch { task, force }) = rx.recv().await {
            let loop_tx = loop_tx.clone();

            let Some(asset) = tasks.get(&task).cloned() else {
                warn!(task = %task, "dispatch for unknown task");
                let _ = loop_tx.send(LoopEvent::TaskFinished { task, ok: false }).await;
                continue;
            };

            tokio::spawn(async move {
                let report = asset.run(force).await;
                report.log_summary();
                let ok = report.is_ok();
                if loop_tx.send(LoopEvent::TaskFinished { task, ok }).await.is_err() {
                    debug!("watch loop closed before task completion was reported");
                }
            });
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}
