//! Concurrency primitives for the real-time cyclic execution engine.
//!
//! Four pieces, all grounded on MARTe2's `Scheduler/L1Portability` and
//! `Scheduler/L3Services` layers: a fast polling lock, a cancellable
//! event, a counting rendezvous built from the two, and a permanent
//! queueing message filter. The thread-service module hosts a
//! caller-supplied callable through a stage-tagged lifecycle, singly or
//! pooled.

pub mod counting_rendezvous;
pub mod error;
pub mod event;
pub mod fast_polling_lock;
pub mod queueing_message_filter;
pub mod thread_service;

pub use counting_rendezvous::{CountingRendezvous, RendezvousOutcome};
pub use error::{ConcurrencyError, Result};
pub use event::Event;
pub use fast_polling_lock::{FastPollingGuard, FastPollingLock};
pub use queueing_message_filter::QueueingMessageFilter;
pub use thread_service::{
    CallableSignal, ExecutionStage, MultiClientService, ServiceStatus, SingleThreadService,
    ThreadCallable,
};
