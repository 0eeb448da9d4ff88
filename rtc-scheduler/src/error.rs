//! Scheduler/state-machine error taxonomy, matching spec §7's
//! `TransitionError` kind.

use thiserror::Error;

use rtc_broker::{CycleError, PlanError};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransitionError {
    #[error("unknown state: {0}")]
    UnknownState(String),

    #[error("thread '{thread}' in state '{state}' names unknown function '{function}'")]
    UnknownFunction { state: String, thread: String, function: String },

    #[error("state prepare failed for {state}: {source}")]
    PrepareFailed { state: String, #[source] source: PlanError },

    #[error("commit rendezvous for {state} timed out")]
    CommitTimeout { state: String },

    #[error("a transition is already in flight")]
    AlreadyTransitioning,

    #[error("cycle error while preparing default values: {0}")]
    Cycle(#[from] CycleError),

    #[error("wait was cancelled by shutdown")]
    Cancelled,

    #[error("unknown event {event} in state {state}")]
    UnknownEvent { state: String, event: String },

    #[error("message aggregate for event {event} failed")]
    MessageAggregateFailed { event: String },
}

pub type Result<T> = std::result::Result<T, TransitionError>;
