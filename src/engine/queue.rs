// src/engine/queue.rs

use std::collections::HashMap;

use tracing::{debug, warn};

use super::TaskName;

/// Per-task dispatch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchState {
    #[default]
    Idle,
    /// A run is in flight. `rerun` records that at least one more trigger
    /// arrived since it started.
    Dispatching { rerun: bool },
}

/// Coalescing queue that keeps at most one run per task in flight and at most
/// one follow-up run pending.
///
/// Semantics:
/// - A request for an idle task dispatches it immediately.
/// - Requests for a dispatching task set the `rerun` flag, no matter how many
///   arrive.
/// - When the run completes, a set flag turns into exactly one new run.
#[derive(Debug, Default)]
pub struct DispatchQueue {
    states: HashMap<TaskName, DispatchState>,
}

impl DispatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, task: &str) -> DispatchState {
        self.states.get(task).copied().unwrap_or_default()
    }

    /// True when no task is in flight.
    pub fn is_idle(&self) -> bool {
        self.states.values().all(|s| *s == DispatchState::Idle)
    }

    /// Record a trigger for `task`. Returns true if the caller should
    /// dispatch it now.
    pub fn request(&mut self, task: &str) -> bool {
        match self.states.get_mut(task) {
            Some(DispatchState::Dispatching { rerun }) => {
                if !*rerun {
                    debug!(task, "task busy; queued one follow-up run");
                }
                *rerun = true;
                false
            }
            _ => {
                self.states
                    .insert(task.to_string(), DispatchState::Dispatching { rerun: false });
                true
            }
        }
    }

    /// Record that the in-flight run of `task` finished. Returns true if the
    /// caller should dispatch it again.
    pub fn complete(&mut self, task: &str) -> bool {
        match self.states.get_mut(task) {
            Some(state @ DispatchState::Dispatching { rerun: true }) => {
                *state = DispatchState::Dispatching { rerun: false };
                true
            }
            Some(state @ DispatchState::Dispatching { rerun: false }) => {
                *state = DispatchState::Idle;
                false
            }
            _ => {
                warn!(task, "completion reported for a task that was not dispatching");
                false
            }
        }
    }
}
