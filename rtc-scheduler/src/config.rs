//! Double-buffered publish used by live reconfiguration (spec §4.5 step 2).
//!
//! Grounded on spec (I-S1): "a real-time thread never reads a half-updated
//! broker list: the index switch is a single word store." The active index
//! is a single atomic word; a reader only ever touches the slot the index
//! names, and a writer only ever touches the *other* slot until the final
//! index flip, so a reader can never observe a torn update.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Two slots of `T`, switched by a single atomic index store.
pub struct DoubleBuffer<T> {
    slots: [Mutex<Option<Arc<T>>>; 2],
    active: AtomicUsize,
}

impl<T> DoubleBuffer<T> {
    pub fn new(initial: Arc<T>) -> Self {
        Self { slots: [Mutex::new(Some(initial)), Mutex::new(None)], active: AtomicUsize::new(0) }
    }

    /// The value a real-time thread should use for its next cycle.
    pub fn current(&self) -> Arc<T> {
        let idx = self.active.load(Ordering::Acquire);
        self.slots[idx]
            .lock()
            .expect("double-buffer slot poisoned")
            .clone()
            .expect("active double-buffer slot always holds a value")
    }

    /// Write `value` into the inactive slot, then flip the index. Returns
    /// the previous value so the caller can free it after commit.
    pub fn publish(&self, value: Arc<T>) -> Arc<T> {
        self.stage(value);
        self.commit()
    }

    /// Write `value` into the inactive slot without switching to it yet.
    /// Paired with `commit` so a caller can stage several double-buffers
    /// and flip them all only once every participant has agreed to (the
    /// live reconfiguration protocol's rendezvous-gated commit).
    pub fn stage(&self, value: Arc<T>) {
        let idx = self.active.load(Ordering::Acquire);
        let next = 1 - idx;
        *self.slots[next].lock().expect("double-buffer slot poisoned") = Some(value);
    }

    /// Flip the index to the staged slot. Returns the previous value.
    pub fn commit(&self) -> Arc<T> {
        let idx = self.active.load(Ordering::Acquire);
        let next = 1 - idx;
        self.active.store(next, Ordering::Release);
        self.slots[idx].lock().expect("double-buffer slot poisoned").clone().expect("previous slot holds a value")
    }
}
