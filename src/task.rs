//! Cancelable handles for spawned loops.

use tokio::task::JoinHandle;

/// Owns a spawned task and aborts it when cancelled or dropped.
///
/// Cancelling is idempotent: the second call finds nothing to abort.
#[derive(Debug)]
pub struct TaskGuard {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
}

impl TaskGuard {
    /// Spawn `future` on the current tokio runtime.
    pub fn spawn<F>(name: &'static str, future: F) -> Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        tracing::trace!(task = name, "spawning");
        Self {
            name,
            handle: Some(tokio::spawn(future)),
        }
    }

    /// True while the task has been neither cancelled nor finished.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            tracing::trace!(task = self.name, "cancelling");
            handle.abort();
        }
    }
}

impl TaskGuard {
    /// Release the task without aborting it.
    pub fn detach(mut self) {
        self.handle.take();
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.cancel();
    }
}
