//! FIFO of pending items, safe to append from many tasks.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::queue::item::QueueItem;

#[derive(Debug, Default)]
pub struct RequestQueue {
    items: Mutex<VecDeque<QueueItem>>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail and return the new length.
    ///
    /// A return of 1 means the queue was empty before this call.
    pub fn enqueue(&self, item: QueueItem) -> usize {
        let mut items = self.lock();
        items.push_back(item);
        items.len()
    }

    /// Remove and return the oldest item.
    pub fn dequeue_front(&self) -> Option<QueueItem> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the deque half-updated.
    fn lock(&self) -> MutexGuard<'_, VecDeque<QueueItem>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
