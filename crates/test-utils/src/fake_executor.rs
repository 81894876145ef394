use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use assetpipe::engine::{LoopEvent, TaskName};
use assetpipe::errors::{BuildError, Result};
use assetpipe::exec::ExecutorBackend;

use tokio::sync::mpsc;

/// A fake executor that records every dispatch as `(task, force)`.
///
/// In auto mode it immediately answers each dispatch with a successful
/// `TaskFinished`. In manual mode it reports nothing and the test sends
/// completions itself, which keeps tasks "busy" for as long as needed.
pub struct FakeExecutor {
    loop_tx: Option<mpsc::Sender<LoopEvent>>,
    dispatched: Arc<Mutex<Vec<(TaskName, bool)>>>,
}

impl FakeExecutor {
    pub fn new(loop_tx: mpsc::Sender<LoopEvent>, dispatched: Arc<Mutex<Vec<(TaskName, bool)>>>) -> Self {
        Self {
            loop_tx: Some(loop_tx),
            dispatched,
        }
    }

    pub fn manual(dispatched: Arc<Mutex<Vec<(TaskName, bool)>>>) -> Self {
        Self {
            loop_tx: None,
            dispatched,
        }
    }
}

impl ExecutorBackend for FakeExecutor {
    fn dispatch(
        &mut self,
        task: TaskName,
        force: bool,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.loop_tx.clone();
        let dispatched = Arc::clone(&self.dispatched);

        Box::pin(async move {
            {
                let mut guard = dispatched.lock().unwrap();
                guard.push((task.clone(), force));
            }

            if let Some(tx) = tx {
                tx.send(LoopEvent::TaskFinished { task, ok: true })
                    .await
                    .map_err(|e| BuildError::Runtime(e.to_string()))?;
            }
            Ok(())
        })
    }
}
