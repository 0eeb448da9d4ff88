//! Unbounded FIFO message queue with blocking, cancellable `get`.
//!
//! Grounded on `Test/Core/Scheduler/L4Messages/QueueingMessageFilterTest.cpp`:
//! `consume` always accepts and never blocks, `IsPermanentFilter` reports
//! that the filter stays installed on its receiver for that receiver's
//! lifetime (modeled here as `is_permanent()` always returning `true`),
//! and messages are delivered in the order consumed (P8).

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::error::{ConcurrencyError, Result};

struct Inner<T> {
    queue: VecDeque<T>,
    closed: bool,
}

/// A permanent, FIFO message filter.
pub struct QueueingMessageFilter<T> {
    inner: Mutex<Inner<T>>,
    condvar: Condvar,
}

impl<T> Default for QueueingMessageFilter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> QueueingMessageFilter<T> {
    /// Construct an empty filter.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner { queue: VecDeque::new(), closed: false }),
            condvar: Condvar::new(),
        }
    }

    /// This filter remains installed on its owning receiver for the
    /// receiver's lifetime.
    pub fn is_permanent(&self) -> bool {
        true
    }

    /// Enqueue a message. Always accepts, never blocks.
    pub fn consume(&self, message: T) {
        let mut inner = self.inner.lock().expect("filter mutex poisoned");
        if inner.closed {
            return;
        }
        inner.queue.push_back(message);
        self.condvar.notify_one();
    }

    /// Block until a message is available, the timeout elapses, or the
    /// filter is closed.
    pub fn get(&self, timeout: Duration) -> Result<T> {
        let mut inner = self.inner.lock().expect("filter mutex poisoned");
        loop {
            if let Some(message) = inner.queue.pop_front() {
                return Ok(message);
            }
            if inner.closed {
                return Err(ConcurrencyError::Cancelled);
            }
            if timeout == Duration::MAX {
                inner = self.condvar.wait(inner).expect("filter mutex poisoned");
            } else {
                let (guard, result) =
                    self.condvar.wait_timeout(inner, timeout).expect("filter mutex poisoned");
                inner = guard;
                if result.timed_out() {
                    if let Some(message) = inner.queue.pop_front() {
                        return Ok(message);
                    }
                    return if inner.closed {
                        Err(ConcurrencyError::Cancelled)
                    } else {
                        Err(ConcurrencyError::TimedOut)
                    };
                }
            }
        }
    }

    /// Permanently close the filter, cancelling any blocked `get`.
    pub fn close(&self) {
        let mut inner = self.inner.lock().expect("filter mutex poisoned");
        inner.closed = true;
        self.condvar.notify_all();
    }

    /// Number of messages currently queued.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("filter mutex poisoned").queue.len()
    }

    /// True if no messages are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn default_filter_is_permanent() {
        let filter: QueueingMessageFilter<u32> = QueueingMessageFilter::new();
        assert!(filter.is_permanent());
    }

    /// P8: messages are returned in consumption order.
    #[test]
    fn get_returns_messages_fifo() {
        let filter = QueueingMessageFilter::new();
        filter.consume("m1");
        filter.consume("m2");
        filter.consume("m3");
        assert_eq!(filter.get(Duration::ZERO).unwrap(), "m1");
        assert_eq!(filter.get(Duration::ZERO).unwrap(), "m2");
        assert_eq!(filter.get(Duration::ZERO).unwrap(), "m3");
    }

    #[test]
    fn get_times_out_when_empty() {
        let filter: QueueingMessageFilter<u32> = QueueingMessageFilter::new();
        let err = filter.get(Duration::from_millis(20)).unwrap_err();
        assert_eq!(err, ConcurrencyError::TimedOut);
    }

    #[test]
    fn get_blocks_until_consume_wakes_it() {
        let filter = Arc::new(QueueingMessageFilter::new());
        let reader = {
            let filter = filter.clone();
            thread::spawn(move || filter.get(Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(20));
        filter.consume(42);
        assert_eq!(reader.join().unwrap().unwrap(), 42);
    }

    #[test]
    fn close_cancels_blocked_get() {
        let filter: Arc<QueueingMessageFilter<u32>> = Arc::new(QueueingMessageFilter::new());
        let reader = {
            let filter = filter.clone();
            thread::spawn(move || filter.get(Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(20));
        filter.close();
        assert_eq!(reader.join().unwrap().unwrap_err(), ConcurrencyError::Cancelled);
    }

    #[test]
    fn consume_after_close_is_dropped() {
        let filter = QueueingMessageFilter::new();
        filter.close();
        filter.consume(1);
        assert!(filter.is_empty());
    }
}
