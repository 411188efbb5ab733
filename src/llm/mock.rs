//! Scripted LLM client for tests
//!
//! Replays a queue of outcomes, records every call with the instant it started,
//! and tracks how many calls overlap.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::llm::client::{Completion, LlmClient, LlmError};

/// One scripted reply
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Reply(String),
    RateLimited,
    Fail(String),
    Panic,
}

/// A recorded call
#[derive(Debug, Clone)]
pub struct MockCall {
    pub prompt: String,
    pub started_at: Instant,
}

/// LLM client that replays scripted outcomes; echoes the prompt once the script runs out
#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<MockOutcome>>,
    calls: Mutex<Vec<MockCall>>,
    latency: Duration,
    tokens_per_call: u64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue outcomes to be returned in order
    pub fn with_script(self, outcomes: impl IntoIterator<Item = MockOutcome>) -> Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(outcomes);
        self
    }

    /// Simulated upstream latency per call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Token count reported with each successful reply
    pub fn with_tokens_per_call(mut self, tokens: u64) -> Self {
        self.tokens_per_call = tokens;
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.prompt).collect()
    }

    /// Highest number of calls ever observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn generate(&self, prompt: &str) -> Result<Completion, LlmError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(MockCall {
                prompt: prompt.to_string(),
                started_at: Instant::now(),
            });

        let outcome = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match outcome {
            None => Ok(Completion::new(format!("echo: {}", prompt), self.tokens_per_call)),
            Some(MockOutcome::Reply(text)) => Ok(Completion::new(text, self.tokens_per_call)),
            Some(MockOutcome::RateLimited) => Err(LlmError::RateLimited { retry_after: None }),
            Some(MockOutcome::Fail(message)) => Err(LlmError::ApiError { status: 500, message }),
            Some(MockOutcome::Panic) => panic!("scripted mock panic"),
        }
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}
