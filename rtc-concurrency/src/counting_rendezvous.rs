//! N-way counting rendezvous (barrier) with force-pass/force-reset escape
//! hatches.
//!
//! Grounded on `Source/Core/Scheduler/L1Portability/CountingSem.h`'s
//! `CountingSem`, which is built from a `FastPollingMutexSem` guarding the
//! arrival counter plus an `EventSem` used to release every waiter at once.
//! This implementation mirrors that composition: a short, non-blocking
//! critical section tracks arrivals, and a single `Event` is posted once to
//! wake every parked participant.

use std::sync::Mutex;
use std::time::Duration;

use crate::error::{ConcurrencyError, Result};
use crate::event::Event;

/// How a `wait_for_all` call was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendezvousOutcome {
    /// All N participants arrived, or `force_pass` was called.
    Success,
}

struct Inner {
    arrived: u32,
    waiting: u32,
    forced_cancel: bool,
}

/// A barrier for exactly `n` participants, re-armed automatically once the
/// last released waiter departs.
pub struct CountingRendezvous {
    n: u32,
    inner: Mutex<Inner>,
    event: Event,
}

impl CountingRendezvous {
    /// Construct a rendezvous for `n` participants. `n` must be >= 1.
    pub fn new(n: u32) -> Self {
        assert!(n >= 1, "CountingRendezvous requires at least one participant");
        Self {
            n,
            inner: Mutex::new(Inner { arrived: 0, waiting: 0, forced_cancel: false }),
            event: Event::new(),
        }
    }

    /// Block until all `n` participants have called `wait_for_all`, the
    /// rendezvous is force-passed/force-reset, or `timeout` elapses.
    pub fn wait_for_all(&self, timeout: Duration) -> Result<RendezvousOutcome> {
        {
            let mut inner = self.inner.lock().expect("rendezvous mutex poisoned");
            inner.arrived += 1;
            inner.waiting += 1;
            if inner.arrived == self.n {
                drop(inner);
                self.event.post();
            }
        }

        let wait_result = self.event.wait(timeout);

        let mut inner = self.inner.lock().expect("rendezvous mutex poisoned");
        inner.waiting -= 1;

        let outcome = match wait_result {
            Ok(()) => {
                if inner.forced_cancel {
                    Err(ConcurrencyError::Cancelled)
                } else {
                    Ok(RendezvousOutcome::Success)
                }
            }
            Err(ConcurrencyError::TimedOut) => {
                inner.arrived = inner.arrived.saturating_sub(1);
                Err(ConcurrencyError::TimedOut)
            }
            Err(other) => Err(other),
        };

        if inner.waiting == 0 {
            inner.arrived = 0;
            inner.forced_cancel = false;
            self.event.reset();
        }

        outcome
    }

    /// Clear all arrivals. Fails if a participant is currently inside
    /// `wait_for_all`.
    pub fn reset(&self) -> Result<()> {
        let mut inner = self.inner.lock().expect("rendezvous mutex poisoned");
        if inner.waiting > 0 {
            return Err(ConcurrencyError::ResetWhileWaiting);
        }
        inner.arrived = 0;
        inner.forced_cancel = false;
        self.event.reset();
        Ok(())
    }

    /// Release every current waiter as cancelled and reset arrivals to
    /// zero. A no-op (beyond the reset) if nobody is currently waiting.
    pub fn force_reset(&self) {
        let mut inner = self.inner.lock().expect("rendezvous mutex poisoned");
        if inner.waiting == 0 {
            inner.arrived = 0;
            inner.forced_cancel = false;
            return;
        }
        inner.forced_cancel = true;
        drop(inner);
        self.event.post();
    }

    /// Release every current waiter as succeeded and reset arrivals to
    /// zero. A no-op (beyond the reset) if nobody is currently waiting.
    pub fn force_pass(&self) {
        let mut inner = self.inner.lock().expect("rendezvous mutex poisoned");
        if inner.waiting == 0 {
            inner.arrived = 0;
            inner.forced_cancel = false;
            return;
        }
        inner.forced_cancel = false;
        drop(inner);
        self.event.post();
    }

    /// Number of participants this rendezvous was constructed for.
    pub fn participants(&self) -> u32 {
        self.n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    /// P7: if all N participants call `wait_for_all` before any force
    /// operation, all N return success in a bounded window.
    #[test]
    fn all_participants_succeed_when_all_arrive() {
        let rendezvous = Arc::new(CountingRendezvous::new(4));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let rendezvous = rendezvous.clone();
            handles.push(thread::spawn(move || {
                rendezvous.wait_for_all(Duration::from_secs(5))
            }));
        }
        for h in handles {
            assert_eq!(h.join().unwrap().unwrap(), RendezvousOutcome::Success);
        }
    }

    #[test]
    fn wait_for_all_times_out_when_not_everyone_arrives() {
        let rendezvous = CountingRendezvous::new(3);
        let err = rendezvous.wait_for_all(Duration::from_millis(30)).unwrap_err();
        assert_eq!(err, ConcurrencyError::TimedOut);
    }

    #[test]
    fn force_reset_cancels_pending_waiters() {
        let rendezvous = Arc::new(CountingRendezvous::new(2));
        let waiter = {
            let rendezvous = rendezvous.clone();
            thread::spawn(move || rendezvous.wait_for_all(Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(30));
        rendezvous.force_reset();
        assert_eq!(waiter.join().unwrap().unwrap_err(), ConcurrencyError::Cancelled);
    }

    #[test]
    fn force_pass_releases_pending_waiters_as_success() {
        let rendezvous = Arc::new(CountingRendezvous::new(5));
        let waiter = {
            let rendezvous = rendezvous.clone();
            thread::spawn(move || rendezvous.wait_for_all(Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(30));
        rendezvous.force_pass();
        assert_eq!(waiter.join().unwrap().unwrap(), RendezvousOutcome::Success);
    }

    #[test]
    fn reset_fails_while_a_participant_is_waiting() {
        let rendezvous = Arc::new(CountingRendezvous::new(2));
        let waiter = {
            let rendezvous = rendezvous.clone();
            thread::spawn(move || rendezvous.wait_for_all(Duration::from_millis(200)))
        };
        thread::sleep(Duration::from_millis(30));
        assert_eq!(rendezvous.reset().unwrap_err(), ConcurrencyError::ResetWhileWaiting);
        waiter.join().unwrap().unwrap_err();
    }

    #[test]
    fn rendezvous_is_reusable_across_rounds() {
        let rendezvous = Arc::new(CountingRendezvous::new(2));
        for _ in 0..3 {
            let rendezvous2 = rendezvous.clone();
            let h = thread::spawn(move || rendezvous2.wait_for_all(Duration::from_secs(5)));
            thread::sleep(Duration::from_millis(10));
            rendezvous.wait_for_all(Duration::from_secs(5)).unwrap();
            h.join().unwrap().unwrap();
        }
    }
}
