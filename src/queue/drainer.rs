//! The chat queue and its single drain worker.
//!
//! `ChatQueue::submit` appends to the FIFO. When that append makes the queue
//! non-empty, a drain task is spawned unless one is already running. The drain
//! task is the only remover: it asks the admission policy for permission,
//! sleeps `poll_delay` while blocked, and otherwise pops the head, calls the
//! LLM, records the outcome, and resolves the item's handle. It exits once the
//! queue is empty.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::task::JoinError;
use tokio::time::Instant;

use crate::error::{GateError, Result};
use crate::llm::{Completion, LlmClient, LlmError};
use crate::queue::item::{CompletionHandle, QueueItem};
use crate::queue::request_queue::RequestQueue;
use crate::scheduler::{AdmissionConfig, AdmissionPolicy, AdmissionSnapshot};

/// Drain worker settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainConfig {
    /// Delay between admission re-checks while blocked.
    pub poll_delay: Duration,
    /// Upper bound on a single upstream call (None = wait forever).
    pub call_timeout: Option<Duration>,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            poll_delay: Duration::from_secs(1),
            call_timeout: Some(Duration::from_secs(120)),
        }
    }
}

impl DrainConfig {
    pub fn with_poll_delay(mut self, delay: Duration) -> Self {
        self.poll_delay = delay;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }
}

/// Point-in-time view of the queue for status output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    pub pending: usize,
    pub draining: bool,
    pub admission: AdmissionSnapshot,
}

struct Shared {
    queue: RequestQueue,
    policy: Mutex<AdmissionPolicy>,
    draining: AtomicBool,
    next_id: AtomicU64,
    client: Arc<dyn LlmClient>,
    config: DrainConfig,
}

/// Rate-limited, single-worker queue in front of an [`LlmClient`].
///
/// Cloning yields another handle to the same queue. Must be used from within a
/// tokio runtime, since submitting may spawn the drain task.
#[derive(Clone)]
pub struct ChatQueue {
    shared: Arc<Shared>,
}

impl ChatQueue {
    pub fn new(client: Arc<dyn LlmClient>, admission: AdmissionConfig, config: DrainConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: RequestQueue::new(),
                policy: Mutex::new(AdmissionPolicy::new(admission)),
                draining: AtomicBool::new(false),
                next_id: AtomicU64::new(1),
                client,
                config,
            }),
        }
    }

    /// Queue a prompt for generation.
    ///
    /// Empty or whitespace-only prompts are rejected here and never enqueued.
    pub fn submit(&self, prompt: impl Into<String>) -> Result<CompletionHandle> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(GateError::Validation("message is required".to_string()));
        }

        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let (item, handle) = QueueItem::new(id, prompt);
        let len = self.shared.queue.enqueue(item);
        debug!("Enqueued request {} (queue length {})", id, len);

        if len == 1 {
            Shared::wake(&self.shared);
        }
        Ok(handle)
    }

    /// Number of items waiting for dispatch.
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }

    /// Whether a drain task is currently active.
    pub fn is_draining(&self) -> bool {
        self.shared.draining.load(Ordering::Acquire)
    }

    pub fn status(&self) -> QueueStatus {
        let admission = self.shared.lock_policy().snapshot(Instant::now());
        QueueStatus {
            pending: self.pending(),
            draining: self.is_draining(),
            admission,
        }
    }

    pub fn model(&self) -> &str {
        self.shared.client.model()
    }
}

impl std::fmt::Debug for ChatQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatQueue")
            .field("model", &self.shared.client.model())
            .field("pending", &self.pending())
            .field("draining", &self.is_draining())
            .finish()
    }
}

impl Shared {
    /// Spawn the drain task unless one is already running.
    fn wake(shared: &Arc<Self>) {
        if shared.try_begin_drain() {
            let shared = Arc::clone(shared);
            tokio::spawn(shared.drain());
        }
    }

    fn try_begin_drain(&self) -> bool {
        self.draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn lock_policy(&self) -> MutexGuard<'_, AdmissionPolicy> {
        self.policy.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn drain(self: Arc<Self>) {
        debug!("Drain task started");
        loop {
            if self.queue.is_empty() {
                self.draining.store(false, Ordering::Release);
                // An enqueue that saw the flag still set relies on this re-check
                if self.queue.is_empty() || !self.try_begin_drain() {
                    debug!("Drain task idle");
                    return;
                }
                continue;
            }

            let admitted = self.lock_policy().can_dispatch(Instant::now());
            if !admitted {
                debug!(
                    "Dispatch blocked, {} request(s) waiting; re-checking in {:?}",
                    self.queue.len(),
                    self.config.poll_delay
                );
                tokio::time::sleep(self.config.poll_delay).await;
                continue;
            }

            if let Some(item) = self.queue.dequeue_front() {
                self.dispatch(item).await;
            }
        }
    }

    async fn dispatch(&self, item: QueueItem) {
        let id = item.id;
        info!("Dispatching request {} (queued {:?})", id, item.enqueued_at.elapsed());

        let outcome = self.call_upstream(item.prompt.clone()).await;
        let outcome = self.record(id, outcome);

        if !item.resolve(outcome) {
            debug!("Caller for request {} went away before completion", id);
        }
    }

    /// Run the call on its own task so a panicking client cannot take the
    /// drain loop down with it.
    async fn call_upstream(&self, prompt: String) -> Result<std::result::Result<Completion, LlmError>> {
        let client = Arc::clone(&self.client);
        let mut call = tokio::spawn(async move { client.generate(&prompt).await });

        let joined = match self.config.call_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut call).await {
                Ok(joined) => joined,
                Err(_) => {
                    // Abort so no call outlives its slot
                    call.abort();
                    return Err(GateError::Internal(format!("upstream call timed out after {:?}", limit)));
                }
            },
            None => call.await,
        };

        joined.map_err(|e: JoinError| GateError::Internal(format!("upstream call failed: {}", e)))
    }

    /// Feed the outcome into the admission state and map it to what the caller sees.
    fn record(&self, id: u64, outcome: Result<std::result::Result<Completion, LlmError>>) -> Result<String> {
        let now = Instant::now();
        match outcome {
            Ok(Ok(completion)) => {
                self.lock_policy().record_success(now, completion.total_tokens);
                info!("Request {} completed ({} tokens)", id, completion.total_tokens);
                Ok(completion.text)
            }
            Ok(Err(e)) if e.is_rate_limit() => {
                let mut policy = self.lock_policy();
                policy.record_rejection(now);
                let retry_after = policy.config().cooldown;
                warn!("Request {} rejected upstream for quota: {}", id, e);
                Err(GateError::RateLimited { retry_after })
            }
            Ok(Err(e)) => {
                error!("Request {} failed: {}", id, e);
                Err(GateError::Internal(e.to_string()))
            }
            Err(e) => {
                error!("Request {} failed: {}", id, e);
                Err(e)
            }
        }
    }
}
