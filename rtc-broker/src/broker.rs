//! The broker runtime: the tagged-variant dispatch spec §9 asks for in
//! place of MARTe2's `BrokerI` virtual hierarchy.

use std::sync::Arc;

use rtc_model::DataSource;
use tracing::instrument;

use crate::descriptor::{CopyDescriptor, MultiBufferEntry};
use crate::error::{CycleError, CycleResult};
use crate::trigger::TriggerOutputBroker;

/// One of the five broker classes bound to a concrete copy plan.
pub enum Broker {
    /// Unconditional byte copies, no blocking.
    DirectCopy { signal_name: String, copies: Vec<CopyDescriptor> },
    /// Rotating-buffer history copies.
    MultiBuffer { signal_name: String, entries: Vec<MultiBufferEntry> },
    /// Blocks on `data_source.synchronise()` before copying.
    SynchronisingInput { signal_name: String, data_source: Arc<dyn DataSource>, copies: Vec<CopyDescriptor> },
    /// Copies, then blocks on `data_source.synchronise()`.
    SynchronisingOutput { signal_name: String, data_source: Arc<dyn DataSource>, copies: Vec<CopyDescriptor> },
    /// Pre/post-trigger ring capture.
    TriggerOutput(TriggerOutputBroker),
}

impl Broker {
    /// Name of the signal this broker was planned for (for diagnostics).
    pub fn signal_name(&self) -> &str {
        match self {
            Broker::DirectCopy { signal_name, .. }
            | Broker::MultiBuffer { signal_name, .. }
            | Broker::SynchronisingInput { signal_name, .. }
            | Broker::SynchronisingOutput { signal_name, .. } => signal_name,
            Broker::TriggerOutput(_) => "trigger-output",
        }
    }

    /// Execute this broker for cycle `cycle`. Never allocates on the
    /// `DirectCopy`/`MultiBuffer` paths.
    #[instrument(skip(self), fields(signal = %self.signal_name()))]
    pub fn execute(&self, cycle: u64) -> CycleResult<()> {
        match self {
            Broker::DirectCopy { signal_name, copies } => {
                for copy in copies {
                    if !copy.execute() {
                        return Err(CycleError::CopyFailed(signal_name.clone()));
                    }
                }
                Ok(())
            }
            Broker::MultiBuffer { signal_name, entries } => {
                for entry in entries {
                    if !entry.execute(cycle) {
                        return Err(CycleError::CopyFailed(signal_name.clone()));
                    }
                }
                Ok(())
            }
            Broker::SynchronisingInput { signal_name, data_source, copies } => {
                data_source.synchronise().map_err(|_| CycleError::SynchroniseFailed(signal_name.clone()))?;
                for copy in copies {
                    if !copy.execute() {
                        return Err(CycleError::CopyFailed(signal_name.clone()));
                    }
                }
                Ok(())
            }
            Broker::SynchronisingOutput { signal_name, data_source, copies } => {
                for copy in copies {
                    if !copy.execute() {
                        return Err(CycleError::CopyFailed(signal_name.clone()));
                    }
                }
                data_source.synchronise().map_err(|_| CycleError::SynchroniseFailed(signal_name.clone()))
            }
            Broker::TriggerOutput(trigger) => trigger.execute(),
        }
    }
}
