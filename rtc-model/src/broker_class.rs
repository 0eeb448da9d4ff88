//! The broker classes a copy descriptor can be bound to.
//!
//! Grounded on MARTe2's `MemoryMapBroker` family (`MemoryMapInputBroker`,
//! `MemoryMapMultiBufferInputBroker`, `MemoryMapSynchronisedInputBroker`,
//! `MemoryMapSynchronisedOutputBroker`, `MemoryMapTriggerOutputBroker`):
//! one enum, one planner decision per signal, shared between the planner
//! (`rtc-model`) and the runtime (`rtc-broker`) so the two never drift.

use std::fmt;

/// The broker implementation a signal's copy is bound to at configure time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrokerClass {
    /// A single unconditional copy between function and data-source memory.
    DirectCopy,
    /// Copies `samples_per_cycle` frames through a rotating buffer set.
    MultiBuffer,
    /// Blocks the owning thread until the data source signals new data is
    /// available, then copies.
    SynchronisingInput,
    /// Copies, then signals the data source that new data is available and
    /// blocks until it has been consumed (or not, per data source policy).
    SynchronisingOutput,
    /// Copies into a pre/post-trigger ring buffer; only flushed to the data
    /// source when a trigger fires.
    TriggerOutput,
}

impl fmt::Display for BrokerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BrokerClass::DirectCopy => "DirectCopy",
            BrokerClass::MultiBuffer => "MultiBuffer",
            BrokerClass::SynchronisingInput => "SynchronisingInput",
            BrokerClass::SynchronisingOutput => "SynchronisingOutput",
            BrokerClass::TriggerOutput => "TriggerOutput",
        };
        write!(f, "{name}")
    }
}

impl BrokerClass {
    /// True for the two classes that participate in thread synchronisation
    /// (at most one signal per thread may select one of these).
    pub fn is_synchronising(&self) -> bool {
        matches!(self, BrokerClass::SynchronisingInput | BrokerClass::SynchronisingOutput)
    }
}
