//! Signal/broker planner (configure-time) and broker runtime (per-cycle).

pub mod broker;
pub mod descriptor;
pub mod error;
pub mod plan;
pub mod trigger;

pub use broker::Broker;
pub use descriptor::{CopyDescriptor, MultiBufferEntry};
pub use error::{CycleError, CycleResult, PlanError, PlanResult};
pub use plan::{plan, FunctionBrokers, PlannerInput};
pub use trigger::{spawn_consumer, TriggerOutputBroker, TriggerRing};
