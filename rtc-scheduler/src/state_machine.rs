//! The message-driven state machine (spec §4.6): a typed tree of
//! `State -> Event -> (NextStateSuccess, NextStateError, Timeout, MessageList)`,
//! driven by a dedicated dispatcher thread consuming a permanent queueing
//! filter.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rtc_concurrency::{CallableSignal, ExecutionStage, QueueingMessageFilter, SingleThreadService, ThreadCallable};
use tracing::{info, instrument, warn};

use crate::error::{Result, TransitionError};

/// A message sent as a side effect of a firing transition.
#[derive(Debug, Clone)]
pub struct Message {
    pub sender: String,
    pub destination: String,
    pub function: String,
    pub payload: Option<String>,
    pub expects_reply: bool,
    pub timeout: Duration,
}

/// Whether a sent message succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Success,
    Failure,
}

/// The collaborator that actually delivers messages. The state machine
/// only needs to know whether each send succeeded.
pub trait MessageBus: Send + Sync {
    fn send(&self, message: &Message) -> MessageOutcome;
}

/// One event's declared side effects and branch targets.
#[derive(Debug, Clone)]
pub struct TransitionSpec {
    pub next_state_success: String,
    pub next_state_error: String,
    pub timeout: Duration,
    pub messages: Vec<Message>,
}

/// The full typed tree: state name -> event name -> transition spec.
#[derive(Debug, Clone, Default)]
pub struct StateMachineSpec {
    pub initial_state: String,
    pub states: HashMap<String, HashMap<String, TransitionSpec>>,
}

/// A running instance of a `StateMachineSpec`, serialising every
/// transition request through one permanent queueing filter.
pub struct StateMachine {
    spec: StateMachineSpec,
    filter: QueueingMessageFilter<String>,
    current: Mutex<String>,
    bus: Arc<dyn MessageBus>,
}

impl StateMachine {
    pub fn new(spec: StateMachineSpec, bus: Arc<dyn MessageBus>) -> Arc<Self> {
        let current = Mutex::new(spec.initial_state.clone());
        Arc::new(Self { spec, filter: QueueingMessageFilter::new(), current, bus })
    }

    /// The state-machine's current state (spec §4.6: observers after an
    /// error transition only ever see the error state, never an
    /// intermediate one, since this read only ever sees a fully committed
    /// `current`).
    pub fn current_state(&self) -> String {
        self.current.lock().expect("state machine current-state mutex poisoned").clone()
    }

    /// Enqueue an event name as a transition request. Non-blocking.
    pub fn fire(&self, event_name: impl Into<String>) {
        self.filter.consume(event_name.into());
    }

    /// Dequeue and process one transition request, blocking up to
    /// `wait_timeout` for one to arrive.
    #[instrument(skip(self))]
    pub fn dispatch_once(&self, wait_timeout: Duration) -> Result<()> {
        let event_name = match self.filter.get(wait_timeout) {
            Ok(name) => name,
            Err(rtc_concurrency::ConcurrencyError::TimedOut) => return Ok(()),
            Err(rtc_concurrency::ConcurrencyError::Cancelled) => return Err(TransitionError::Cancelled),
            Err(_) => return Err(TransitionError::Cancelled),
        };

        let state = self.current_state();
        let Some(events) = self.spec.states.get(&state) else {
            return Err(TransitionError::UnknownState(state));
        };
        let Some(transition) = events.get(&event_name) else {
            return Err(TransitionError::UnknownEvent { state, event: event_name });
        };

        let mut aggregate_ok = true;
        for message in &transition.messages {
            let outcome = self.bus.send(message);
            if message.expects_reply && outcome == MessageOutcome::Failure {
                aggregate_ok = false;
            }
        }

        let next = if aggregate_ok { &transition.next_state_success } else { &transition.next_state_error };
        info!(from = %state, event = %event_name, to = %next, success = aggregate_ok, "state machine transition");
        *self.current.lock().expect("state machine current-state mutex poisoned") = next.clone();

        if !aggregate_ok {
            return Err(TransitionError::MessageAggregateFailed { event: event_name });
        }
        Ok(())
    }

    /// Stop accepting new transition requests and cancel any blocked
    /// dispatcher.
    pub fn shutdown(&self) {
        self.filter.close();
    }
}

/// Spawn the dedicated dispatcher thread (spec §4.6's "a dedicated
/// embedded thread dequeues, matches ... and on match [transitions]").
pub fn spawn_dispatcher(machine: Arc<StateMachine>, poll_timeout: Duration, stop_timeout: Duration) -> SingleThreadService {
    let callable: ThreadCallable = Arc::new(move |stage| match stage {
        ExecutionStage::StartUp => CallableSignal::Ok,
        ExecutionStage::Main => match machine.dispatch_once(poll_timeout) {
            Ok(()) => CallableSignal::Ok,
            Err(TransitionError::Cancelled) => CallableSignal::Ok,
            Err(err) => {
                warn!(%err, "state machine transition failed");
                CallableSignal::Ok
            }
        },
        ExecutionStage::Termination | ExecutionStage::BadTermination => {
            machine.shutdown();
            CallableSignal::Ok
        }
    });
    SingleThreadService::new(callable, stop_timeout)
}
