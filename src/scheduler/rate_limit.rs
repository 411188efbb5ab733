//! Cool-down state after upstream quota rejections.
//!
//! When the Gemini API rejects a call for quota reasons, dispatch pauses for a
//! fixed cool-down measured from the most recent rejection.

use std::time::Duration;

use tokio::time::Instant;

/// Default cool-down after a quota rejection.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(20);

/// Rejection timestamp plus the fixed cool-down it imposes.
#[derive(Debug)]
pub struct BackoffState {
    /// Most recent quota rejection (None = never rejected).
    pub last_rejection: Option<Instant>,
    /// How long dispatch stays paused after a rejection.
    pub cooldown: Duration,
    /// Rejections seen over the lifetime of the queue.
    pub total_rejections: u64,
}

impl BackoffState {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            last_rejection: None,
            cooldown,
            total_rejections: 0,
        }
    }

    /// Record a quota rejection at `now`.
    ///
    /// The timestamp is never cleared; the cool-down lapses purely with time.
    pub fn record_rejection(&mut self, now: Instant) {
        self.last_rejection = Some(now);
        self.total_rejections += 1;

        tracing::warn!(
            cooldown_secs = self.cooldown.as_secs(),
            total_rejections = self.total_rejections,
            "Upstream quota rejection, pausing dispatch"
        );
    }

    /// Check whether dispatch is still paused at `now`.
    pub fn is_cooling_down(&self, now: Instant) -> bool {
        self.remaining(now).is_some()
    }

    /// Remaining cool-down at `now`, if any.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.last_rejection.and_then(|t| {
            let elapsed = now.saturating_duration_since(t);
            if elapsed < self.cooldown {
                Some(self.cooldown - elapsed)
            } else {
                None
            }
        })
    }
}

impl Default for BackoffState {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_state_new() {
        let state = BackoffState::default();
        assert!(!state.is_cooling_down(Instant::now()));
        assert!(state.last_rejection.is_none());
        assert_eq!(state.cooldown, Duration::from_secs(20));
    }

    #[test]
    fn test_record_rejection() {
        let t0 = Instant::now();
        let mut state = BackoffState::default();

        state.record_rejection(t0);

        assert!(state.is_cooling_down(t0));
        assert_eq!(state.total_rejections, 1);
        assert_eq!(state.last_rejection, Some(t0));
    }

    #[test]
    fn test_cooldown_expires_with_time() {
        let t0 = Instant::now();
        let mut state = BackoffState::new(Duration::from_secs(20));

        state.record_rejection(t0);

        assert!(state.is_cooling_down(t0 + Duration::from_millis(19_999)));
        assert!(!state.is_cooling_down(t0 + Duration::from_secs(20)));
        // Timestamp is kept even after expiry
        assert!(state.last_rejection.is_some());
    }

    #[test]
    fn test_remaining() {
        let t0 = Instant::now();
        let mut state = BackoffState::new(Duration::from_secs(20));

        assert!(state.remaining(t0).is_none());

        state.record_rejection(t0);
        assert_eq!(state.remaining(t0 + Duration::from_secs(5)), Some(Duration::from_secs(15)));
        assert!(state.remaining(t0 + Duration::from_secs(25)).is_none());
    }

    #[test]
    fn test_new_rejection_restarts_cooldown() {
        let t0 = Instant::now();
        let mut state = BackoffState::new(Duration::from_secs(20));

        state.record_rejection(t0);
        state.record_rejection(t0 + Duration::from_secs(15));

        assert!(state.is_cooling_down(t0 + Duration::from_secs(30)));
        assert!(!state.is_cooling_down(t0 + Duration::from_secs(35)));
        assert_eq!(state.total_rejections, 2);
    }
}
