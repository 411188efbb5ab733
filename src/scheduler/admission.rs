//! Admission decision: may the next queued item be dispatched now?

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::scheduler::rate_limit::{BackoffState, DEFAULT_COOLDOWN};
use crate::scheduler::window::RateWindow;

/// Limits applied to upstream dispatch. Fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionConfig {
    /// Max dispatched calls inside one window.
    pub max_requests_per_window: usize,
    /// Length of the sliding window.
    pub window: Duration,
    /// Pause after a quota rejection.
    pub cooldown: Duration,
    /// Optional token budget per window (None = unlimited).
    pub max_tokens_per_window: Option<u64>,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_requests_per_window: 5,
            window: Duration::from_secs(60),
            cooldown: DEFAULT_COOLDOWN,
            max_tokens_per_window: None,
        }
    }
}

impl AdmissionConfig {
    /// Create config with custom values.
    pub fn new(max_requests_per_window: usize, window: Duration, cooldown: Duration) -> Self {
        Self {
            max_requests_per_window,
            window,
            cooldown,
            max_tokens_per_window: None,
        }
    }

    pub fn with_token_budget(mut self, max_tokens: u64) -> Self {
        self.max_tokens_per_window = Some(max_tokens);
        self
    }
}

/// Point-in-time view of the admission state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdmissionSnapshot {
    pub recent_requests: usize,
    pub recent_tokens: u64,
    pub cooldown_remaining_ms: Option<u64>,
    pub can_dispatch: bool,
}

/// Sliding-window request budget combined with rejection cool-down.
///
/// This is the only place admission is decided. Every query takes the current
/// instant explicitly so the decision is a function of state and time alone.
#[derive(Debug)]
pub struct AdmissionPolicy {
    config: AdmissionConfig,
    window: RateWindow,
    backoff: BackoffState,
}

impl AdmissionPolicy {
    pub fn new(config: AdmissionConfig) -> Self {
        let window = RateWindow::new(config.window);
        let backoff = BackoffState::new(config.cooldown);
        Self {
            config,
            window,
            backoff,
        }
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    pub fn can_dispatch(&mut self, now: Instant) -> bool {
        if self.window.count_recent(now) >= self.config.max_requests_per_window {
            return false;
        }
        if self.backoff.is_cooling_down(now) {
            return false;
        }
        match self.config.max_tokens_per_window {
            Some(budget) => self.window.weight_recent(now) < budget,
            None => true,
        }
    }

    /// Record a successful upstream call that billed `tokens`.
    pub fn record_success(&mut self, now: Instant, tokens: u64) {
        self.window.record_weighted(now, tokens);
    }

    /// Record an upstream quota rejection.
    pub fn record_rejection(&mut self, now: Instant) {
        self.backoff.record_rejection(now);
    }

    pub fn snapshot(&mut self, now: Instant) -> AdmissionSnapshot {
        let can_dispatch = self.can_dispatch(now);
        AdmissionSnapshot {
            recent_requests: self.window.count_recent(now),
            recent_tokens: self.window.weight_recent(now),
            cooldown_remaining_ms: self.backoff.remaining(now).map(|d| d.as_millis() as u64),
            can_dispatch,
        }
    }
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self::new(AdmissionConfig::default())
    }
}
