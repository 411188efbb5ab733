//! Error types for chatgate
//!
//! Centralized error handling using thiserror. Every failure a caller can
//! observe through a completion handle is one of these variants.

use std::time::Duration;

use thiserror::Error;

/// All error types that can occur in chatgate
#[derive(Debug, Error)]
pub enum GateError {
    /// Payload rejected before it reached the queue
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Upstream quota rejection; the caller should resubmit after `retry_after`
    #[error("Rate limit exceeded, retry after {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// Any other failure while serving a queued item
    #[error("Internal error: {0}")]
    Internal(String),

    /// LLM client construction or configuration error
    #[error("LLM error: {0}")]
    Llm(String),
}

impl GateError {
    /// Suggested resubmission delay in whole seconds, for rate-limited failures only.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            GateError::RateLimited { retry_after } => Some(retry_after.as_secs()),
            _ => None,
        }
    }
}

/// Result type alias for chatgate operations
pub type Result<T> = std::result::Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = GateError::Validation("message is required".to_string());
        assert_eq!(err.to_string(), "Validation failed: message is required");
        assert!(err.retry_after_secs().is_none());
    }

    #[test]
    fn test_rate_limited_error() {
        let err = GateError::RateLimited {
            retry_after: Duration::from_secs(20),
        };
        assert_eq!(err.to_string(), "Rate limit exceeded, retry after 20s");
        assert_eq!(err.retry_after_secs(), Some(20));
    }

    #[test]
    fn test_internal_error() {
        let err = GateError::Internal("connection reset".to_string());
        assert_eq!(err.to_string(), "Internal error: connection reset");
        assert!(err.retry_after_secs().is_none());
    }
}
