// src/engine/core.rs

//! Pure watch-loop state machine.
//!
//! [`WatchCore`] consumes [`LoopEvent`]s and produces [`LoopCommand`]s for the
//! async shell in [`super::runtime`]. It owns no channels and performs no IO,
//! so it can be unit tested without Tokio.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use super::queue::DispatchQueue;
use super::{LoopCommand, LoopEvent, TaskName};
use crate::watch::RoutingTable;

/// Commands produced by a single [`WatchCore::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    pub commands: Vec<LoopCommand>,
    pub keep_running: bool,
}

impl CoreStep {
    fn continue_with(commands: Vec<LoopCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

#[derive(Debug)]
pub struct WatchCore {
    routes: RoutingTable,
    queue: DispatchQueue,
    /// Tasks whose successful run emits a reload signal.
    reload_on: HashSet<TaskName>,
    /// Tasks always dispatched with `force = true`.
    forced: HashSet<TaskName>,
}

impl WatchCore {
    pub fn new<I, S>(routes: RoutingTable, reload_on: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        Self {
            routes,
            queue: DispatchQueue::new(),
            reload_on: reload_on.into_iter().map(Into::into).collect(),
            forced: HashSet::new(),
        }
    }

    /// Always rebuild every file of `task` when it is dispatched.
    pub fn force_task(mut self, task: impl Into<TaskName>) -> Self {
        self.forced.insert(task.into());
        self
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_idle()
    }

    pub fn step(&mut self, event: LoopEvent) -> CoreStep {
        match event {
            LoopEvent::Change(change) => {
                let rel = change.rel_path();
                let tasks = self.routes.tasks_for(&rel);
                if tasks.is_empty() {
                    debug!(path = %rel, "change matches no task");
                    return CoreStep::continue_with(Vec::new());
                }

                info!(path = %rel, kind = ?change.kind, ?tasks, "source changed");
                let mut commands = Vec::new();
                for task in tasks {
                    if self.queue.request(&task) {
                        commands.push(self.dispatch(task));
                    }
                }
                CoreStep::continue_with(commands)
            }
            LoopEvent::TaskFinished { task, ok } => {
                let rerun = self.queue.complete(&task);
                let mut commands = Vec::new();

                if !ok {
                    warn!(task = %task, "rebuild failed; waiting for the next change");
                }
                if rerun {
                    debug!(task = %task, "dispatching coalesced follow-up run");
                    commands.push(self.dispatch(task));
                } else if ok && self.reload_on.contains(&task) {
                    commands.push(LoopCommand::Reload);
                }
                CoreStep::continue_with(commands)
            }
            LoopEvent::Shutdown => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }

    fn dispatch(&self, task: TaskName) -> LoopCommand {
        let force = self.forced.contains(&task);
        LoopCommand::Dispatch { task, force }
    }
}
