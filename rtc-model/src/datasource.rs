//! The `DataSource` contract: the memory-owning side of a signal copy.
//!
//! Grounded on MARTe2's `DataSourceI` interface (`GetNumberOfMemoryBuffers`,
//! `GetSignalMemoryBuffer`, `GetBrokerName`, `PrepareNextState`,
//! `Synchronise`).

use crate::broker_class::BrokerClass;
use crate::error::Result;
use crate::memory::MemoryOwner;
use crate::signal::Direction;
use crate::value::ElementType;

/// A named source (or sink) of signal memory, shared by one or more
/// functions across one or more threads.
pub trait DataSource: MemoryOwner {
    /// Unique name within the application.
    fn name(&self) -> &str;

    /// Resolve a signal name (as registered with this data source) to the
    /// index used by `MemoryOwner::signal_memory`.
    fn signal_index(&self, name: &str) -> Option<usize>;

    /// Declared element type and total element count for `signal_index`,
    /// if this data source tracks per-signal shape. The planner checks
    /// this against the requesting function's own declaration before
    /// emitting any copy descriptor for the signal; `None` opts a data
    /// source with no declared per-signal type (e.g. a raw byte store)
    /// out of the check.
    fn signal_shape(&self, _signal_index: usize) -> Option<(ElementType, u32)> {
        None
    }

    /// How many rotating memory buffers this data source exposes
    /// (1 for ordinary data sources, >1 for double/multi buffering).
    fn number_of_memory_buffers(&self) -> u32 {
        1
    }

    /// Preferred broker class for a signal of the given direction, if the
    /// data source has an opinion; the planner falls back to `DirectCopy`
    /// when `None`.
    fn preferred_broker(&self, _direction: Direction) -> Option<BrokerClass> {
        None
    }

    /// Called once per state transition before the new state's threads
    /// start, so the data source can reallocate or reset buffers.
    fn prepare_next_state(&self, _next_state: &str) -> Result<()> {
        Ok(())
    }

    /// For synchronising data sources: block the calling thread until new
    /// data is ready (input) or has been consumed (output).
    fn synchronise(&self) -> Result<()> {
        Ok(())
    }

    /// True if this data source can only be bound by a single thread at a
    /// time (most synchronising sources); false for shared memory sources.
    fn exclusive_access(&self) -> bool {
        false
    }

    /// True if this data source accepts triggered writes from a
    /// `TriggerOutput` broker.
    fn accepts_triggered_writes(&self) -> bool {
        false
    }
}
