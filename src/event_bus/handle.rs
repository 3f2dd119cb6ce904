use tokio::task::JoinHandle;

use crate::{SyncError, event_bus::HandlerResult};

/// Completion signal of one [`EventBus::emit`](crate::EventBus::emit).
///
/// Dropping the handle detaches the handlers; they keep running. Awaiting [`wait`](Self::wait)
/// resolves once every handler finished.
#[derive(Debug)]
pub struct EmitHandle {
    task: Option<JoinHandle<Vec<HandlerResult>>>,
}

impl EmitHandle {
    pub(crate) fn completed() -> Self {
        Self { task: None }
    }

    pub(crate) fn spawned(task: JoinHandle<Vec<HandlerResult>>) -> Self {
        Self { task: Some(task) }
    }

    /// Wait for every handler and return their outcomes in registration order.
    ///
    /// Empty when no handler was registered.
    pub async fn wait(self) -> Vec<HandlerResult> {
        let Some(task) = self.task else {
            return Vec::new();
        };
        match task.await {
            Ok(results) => results,
            Err(err) => vec![Err(SyncError::Handler(err.to_string()))],
        }
    }

    /// Like [`wait`](Self::wait), collapsed to the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first error reported by a handler.
    pub async fn wait_ok(self) -> Result<(), SyncError> {
        self.wait().await.into_iter().collect()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }
}
