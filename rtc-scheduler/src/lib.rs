//! State/thread scheduler, live reconfiguration protocol, and the
//! message-driven state machine.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod plan;
pub mod runtime;
pub mod scheduler;
pub mod state_machine;

pub use config::DoubleBuffer;
pub use descriptor::{StateDescriptor, ThreadDescriptor};
pub use error::{Result, TransitionError};
pub use plan::{prepare_state, BoundFunction, StatePlan, ThreadPlan};
pub use runtime::RealTimeThread;
pub use scheduler::Scheduler;
pub use state_machine::{spawn_dispatcher, Message, MessageBus, MessageOutcome, StateMachine, StateMachineSpec, TransitionSpec};
