//! chatgate - a rate-limited request queue for the Gemini API
//!
//! Prompts are queued in arrival order and sent upstream one at a time, no
//! more than a configured number per sliding window, with a fixed cool-down
//! after any quota rejection.

pub mod error;
pub mod llm;
pub mod queue;
pub mod scheduler;

pub use error::{GateError, Result};
pub use queue::{ChatQueue, CompletionHandle, DrainConfig};
pub use scheduler::AdmissionConfig;
