//! Queued work items and the handles callers await them with.

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::error::{GateError, Result};

/// A prompt waiting for dispatch, plus the sink its outcome is delivered to.
#[derive(Debug)]
pub struct QueueItem {
    pub id: u64,
    pub prompt: String,
    pub enqueued_at: Instant,
    sink: oneshot::Sender<Result<String>>,
}

impl QueueItem {
    /// Create an item and the handle that observes its outcome.
    pub fn new(id: u64, prompt: String) -> (Self, CompletionHandle) {
        let (sink, rx) = oneshot::channel();
        let item = Self {
            id,
            prompt,
            enqueued_at: Instant::now(),
            sink,
        };
        (item, CompletionHandle { id, rx })
    }

    /// Deliver the outcome. Consumes the item, so it resolves at most once.
    ///
    /// Returns false if the caller dropped its handle.
    pub fn resolve(self, outcome: Result<String>) -> bool {
        self.sink.send(outcome).is_ok()
    }
}

/// Caller side of a queued prompt.
#[derive(Debug)]
pub struct CompletionHandle {
    id: u64,
    rx: oneshot::Receiver<Result<String>>,
}

impl CompletionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the generated text or a typed failure.
    pub async fn wait(self) -> Result<String> {
        self.rx
            .await
            .unwrap_or_else(|_| Err(GateError::Internal("request was dropped by the queue worker".to_string())))
    }
}
