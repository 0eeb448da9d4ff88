//! A cancellable event primitive.
//!
//! Grounded on MARTe2's `EventSem` (`Source/Core/Scheduler/L1Portability/CountingSem.h`
//! builds `CountingSem` on top of it): `wait(timeout)`, `post()`, `reset()`,
//! plus a `close()` that makes every subsequent `post()` a no-op and every
//! outstanding or future `wait()` return cancelled rather than a false
//! success.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::error::{ConcurrencyError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventState {
    Clear,
    Signaled,
    Closed,
}

/// A single-shot-per-cycle signal with cancellable, bounded waits.
#[derive(Debug)]
pub struct Event {
    state: Mutex<EventState>,
    condvar: Condvar,
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}

impl Event {
    /// Construct a new event in the clear state.
    pub fn new() -> Self {
        Self { state: Mutex::new(EventState::Clear), condvar: Condvar::new() }
    }

    /// Block until the event is posted, the timeout elapses, or the event
    /// is closed.
    pub fn wait(&self, timeout: Duration) -> Result<()> {
        let mut state = self.state.lock().expect("event mutex poisoned");
        loop {
            match *state {
                EventState::Signaled => return Ok(()),
                EventState::Closed => return Err(ConcurrencyError::Cancelled),
                EventState::Clear => {}
            }
            if timeout == Duration::MAX {
                state = self.condvar.wait(state).expect("event mutex poisoned");
            } else {
                let (guard, result) =
                    self.condvar.wait_timeout(state, timeout).expect("event mutex poisoned");
                state = guard;
                if result.timed_out() {
                    return match *state {
                        EventState::Signaled => Ok(()),
                        EventState::Closed => Err(ConcurrencyError::Cancelled),
                        EventState::Clear => Err(ConcurrencyError::TimedOut),
                    };
                }
            }
        }
    }

    /// Signal the event, waking every waiter. A no-op once closed.
    pub fn post(&self) {
        let mut state = self.state.lock().expect("event mutex poisoned");
        if *state == EventState::Closed {
            return;
        }
        *state = EventState::Signaled;
        self.condvar.notify_all();
    }

    /// Clear the signal without waking anyone. A no-op once closed.
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("event mutex poisoned");
        if *state == EventState::Closed {
            return;
        }
        *state = EventState::Clear;
    }

    /// Permanently close the event: every future `post()` is a no-op and
    /// every waiter (current or future) observes `Cancelled`.
    pub fn close(&self) {
        let mut state = self.state.lock().expect("event mutex poisoned");
        *state = EventState::Closed;
        self.condvar.notify_all();
    }

    /// True once `close()` has been called.
    pub fn is_closed(&self) -> bool {
        *self.state.lock().expect("event mutex poisoned") == EventState::Closed
    }
}
