//! Admission control for upstream calls.
//!
//! This module provides:
//! - **RateWindow**: sliding-window count of recent dispatches (and tokens).
//! - **BackoffState**: fixed cool-down after an upstream quota rejection.
//! - **AdmissionPolicy**: the single yes/no gate combining both.

mod admission;
mod rate_limit;
mod window;

pub use admission::{AdmissionConfig, AdmissionPolicy, AdmissionSnapshot};
pub use rate_limit::{BackoffState, DEFAULT_COOLDOWN};
pub use window::RateWindow;
