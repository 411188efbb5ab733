//! LLM Client Layer - Gemini API integration
//!
//! This module provides:
//! - LlmClient trait for API abstraction
//! - GeminiClient implementation
//! - MockLlmClient for tests (`test-util` feature)

pub mod client;
pub mod gemini;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::{Completion, LlmClient, LlmError};
pub use gemini::{GeminiClient, GeminiConfig};
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockCall, MockLlmClient, MockOutcome};
