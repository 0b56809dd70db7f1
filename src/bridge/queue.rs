// ABOUTME: Closeable FIFO between the ingress listener and the per-tick consumer
// ABOUTME: One mutex/condvar pair guards the items and the closed flag

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<String>,
    closed: bool,
}

/// Thread-safe, closeable queue of framed event lines.
///
/// Items come out in exactly the order they went in. After [`close`](Self::close)
/// pushes are refused, but items already queued are still handed out before
/// [`pop`](Self::pop) reports end of stream.
#[derive(Debug, Default)]
pub struct EventQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl EventQueue {
    /// Create an empty, open queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item. Returns false (and drops the item) if the queue is closed.
    pub fn push(&self, item: impl Into<String>) -> bool {
        {
            let mut state = self.state.lock();
            if state.closed {
                return false;
            }
            state.items.push_back(item.into());
        }
        self.ready.notify_one();
        true
    }

    /// Block until an item is available or the queue is closed.
    ///
    /// Returns `None` only once the queue is closed and empty.
    pub fn pop(&self) -> Option<String> {
        let mut state = self.state.lock();
        while state.items.is_empty() && !state.closed {
            self.ready.wait(&mut state);
        }
        state.items.pop_front()
    }

    /// Take the head item without waiting
    pub fn try_pop(&self) -> Option<String> {
        self.state.lock().items.pop_front()
    }

    /// Close the queue and wake every blocked consumer. Idempotent.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.ready.notify_all();
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of queued items
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Check if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_fifo_order() {
        let queue = EventQueue::new();
        for i in 0..100 {
            assert!(queue.push(format!("event {i}")));
        }
        for i in 0..100 {
            assert_eq!(queue.pop(), Some(format!("event {i}")));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_close_drains_then_ends() {
        let queue = EventQueue::new();
        queue.push("a");
        queue.push("b");
        queue.close();

        assert_eq!(queue.pop().as_deref(), Some("a"));
        assert_eq!(queue.pop().as_deref(), Some("b"));
        assert_eq!(queue.pop(), None);
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_push_after_close_rejected() {
        let queue = EventQueue::new();
        queue.close();
        queue.close();
        assert!(queue.is_closed());
        assert!(!queue.push("late"));
        assert!(!queue.push("later"));
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_try_pop_does_not_block() {
        let queue = EventQueue::new();
        assert_eq!(queue.try_pop(), None);
        queue.push("x");
        assert_eq!(queue.try_pop().as_deref(), Some("x"));
        assert_eq!(queue.try_pop(), None);
        assert!(!queue.is_closed());
    }

    #[test]
    fn test_pop_wakes_on_push() {
        let queue = Arc::new(EventQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };

        thread::sleep(Duration::from_millis(20));
        queue.push("wake");
        assert_eq!(consumer.join().unwrap().as_deref(), Some("wake"));
    }

    #[test]
    fn test_close_wakes_blocked_consumers() {
        let queue = Arc::new(EventQueue::new());
        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || queue.pop())
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        queue.close();
        for consumer in consumers {
            assert_eq!(consumer.join().unwrap(), None);
        }
    }

    #[test]
    fn test_producer_consumer_threads_keep_order() {
        let queue = Arc::new(EventQueue::new());
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..1000 {
                    queue.push(i.to_string());
                }
                queue.close();
            })
        };

        let mut received = Vec::new();
        while let Some(item) = queue.pop() {
            received.push(item.parse::<u32>().unwrap());
        }
        producer.join().unwrap();

        assert_eq!(received, (0..1000).collect::<Vec<_>>());
    }
}
