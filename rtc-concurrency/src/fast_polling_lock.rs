//! A single-flag spin lock with a bounded, pollable acquire.
//!
//! Grounded on `Source/Core/Scheduler/L1Portability/CountingSem.h`'s
//! `FastPollingMutexSem` companion: short critical sections only, no
//! blocking inside the held section, acquire bounded by a timeout rather
//! than unbounded parking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{ConcurrencyError, Result};

/// A polling lock backed by a single atomic flag.
///
/// `lock` spins on a compare-and-set until it succeeds or the timeout
/// elapses. Holders must keep critical sections short and non-blocking:
/// this primitive exists for the broker and scheduler fast paths, not for
/// general-purpose mutual exclusion.
#[derive(Debug, Default)]
pub struct FastPollingLock {
    flag: AtomicBool,
}

impl FastPollingLock {
    /// Construct an unlocked lock.
    pub fn new() -> Self {
        Self { flag: AtomicBool::new(false) }
    }

    /// Attempt to acquire the lock, spinning until `timeout` elapses.
    ///
    /// `Duration::MAX` is the infinite-wait sentinel; it still only
    /// returns once the flag is observed free, there is no separate
    /// cancellation path for this primitive (by design: critical sections
    /// must be bounded, so an infinite wait here indicates a configuration
    /// error upstream rather than something to cancel).
    pub fn lock(&self, timeout: Duration) -> Result<FastPollingGuard<'_>> {
        let deadline = if timeout == Duration::MAX {
            None
        } else {
            Some(Instant::now() + timeout)
        };
        loop {
            if self
                .flag
                .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return Ok(FastPollingGuard { lock: self });
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(ConcurrencyError::TimedOut);
                }
            }
            thread::yield_now();
        }
    }

    fn unlock(&self) {
        self.flag.store(false, Ordering::Release);
    }

    /// Non-blocking probe: true if currently held.
    pub fn is_locked(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// RAII guard released on drop. `unlock()` is only legal from the holder;
/// since this guard is only constructible by a successful `lock()`, that
/// invariant is enforced by the type system rather than at runtime.
#[must_use]
#[derive(Debug)]
pub struct FastPollingGuard<'a> {
    lock: &'a FastPollingLock,
}

impl Drop for FastPollingGuard<'_> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}
