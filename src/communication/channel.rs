// communication/channel.rs
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::Notify;

/// Unbounded FIFO hand-off between producer and consumer tasks.
///
/// Every value sent is delivered to exactly one receiver. Several tasks
/// blocked in [`Channel::receive`] compete for messages; a single `send`
/// satisfies only one of them.
#[derive(Debug)]
pub struct Channel<T> {
    queue: Mutex<VecDeque<T>>,
    item_ready: Notify,
}

impl<T> Channel<T> {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            item_ready: Notify::new(),
        }
    }

    /// Appends a value to the tail and wakes at most one blocked receiver.
    /// Never blocks.
    pub fn send(&self, message: T) {
        self.queue.lock().push_back(message);
        self.item_ready.notify_one();
    }

    /// Waits until the channel is non-empty, then removes and returns the head.
    pub async fn receive(&self) -> T {
        loop {
            let notified = self.item_ready.notified();
            let head = self.queue.lock().pop_front();
            if let Some(message) = head {
                return message;
            }
            notified.await;
        }
    }

    /// Number of values sent but not yet received.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Discards every value not yet received and returns how many there were.
    pub fn clear(&self) -> usize {
        let mut queue = self.queue.lock();
        let dropped = queue.len();
        queue.clear();
        dropped
    }
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}
