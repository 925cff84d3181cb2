//! Reveal Gallery - Delayed Tasks
//!
//! One-shot timers on the tokio runtime. A task carries the generation of
//! the gallery it was scheduled for; the callback compares it against the
//! live generation before touching anything.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Cancellable one-shot task. Dropping it cancels the task.
#[derive(Debug)]
pub struct DelayedTask {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl DelayedTask {
    /// Run `task` after `delay`
    pub fn spawn<F>(delay: Duration, generation: u64, task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });

        Self {
            generation,
            handle: Some(handle),
        }
    }

    /// Generation token the task was scheduled under
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Abort the task if it has not completed
    pub fn cancel(mut self) {
        self.abort();
    }

    /// Forget the task without aborting it. Used from inside the task once
    /// it has fired, so it does not cancel itself.
    pub fn disarm(mut self) {
        self.handle.take();
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for DelayedTask {
    fn drop(&mut self) {
        self.abort();
    }
}
