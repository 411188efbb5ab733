//! Sliding-window event counter.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Timestamped events retained over a trailing window.
///
/// Each event carries a weight (tokens billed) so the same window answers
/// both "how many requests" and "how many tokens" in the last `window`.
#[derive(Debug)]
pub struct RateWindow {
    window: Duration,
    events: VecDeque<(Instant, u64)>,
}

impl RateWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            events: VecDeque::new(),
        }
    }

    /// Record an unweighted event.
    pub fn record_event(&mut self, now: Instant) {
        self.record_weighted(now, 0);
    }

    /// Record an event carrying `weight` tokens.
    pub fn record_weighted(&mut self, now: Instant, weight: u64) {
        self.purge(now);
        self.events.push_back((now, weight));
    }

    /// Number of events inside the window ending at `now`.
    pub fn count_recent(&mut self, now: Instant) -> usize {
        self.purge(now);
        self.events.len()
    }

    /// Summed weight of events inside the window ending at `now`.
    pub fn weight_recent(&mut self, now: Instant) -> u64 {
        self.purge(now);
        self.events.iter().map(|(_, w)| w).sum()
    }

    // Events are appended in time order, so expired ones are always at the front.
    fn purge(&mut self, now: Instant) {
        while let Some((t, _)) = self.events.front() {
            if now.saturating_duration_since(*t) >= self.window {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }
}
