use crate::traits::{Task, TaskExecutor};
use anyhow::{Context, Result};
use std::time::Duration;
use tokio::runtime::Handle;

/// [`TaskExecutor`] backed by a tokio runtime.
///
/// `submit` spawns onto the runtime's worker pool; `schedule` spawns a task
/// that sleeps for the delay before running.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Executor for the runtime the caller is running on.
    pub fn current() -> Result<Self> {
        let handle = Handle::try_current().context("No tokio runtime available")?;
        Ok(Self::new(handle))
    }
}

impl TaskExecutor for TokioExecutor {
    fn submit(&self, task: Task) {
        self.handle.spawn(task);
    }

    fn schedule(&self, task: Task, delay: Duration) {
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
    }
}
