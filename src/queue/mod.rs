//! Request queue and drain worker.
//!
//! Prompts are dispatched strictly in arrival order by a single worker, so at
//! most one upstream call is ever in flight.

mod drainer;
mod item;
mod request_queue;

pub use drainer::{ChatQueue, DrainConfig, QueueStatus};
pub use item::{CompletionHandle, QueueItem};
pub use request_queue::RequestQueue;
