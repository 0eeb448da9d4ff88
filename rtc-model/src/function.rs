//! The `Function` contract: the compute-owning side of a cycle.
//!
//! Grounded on MARTe2's `GAM` interface (`Setup`, `Execute`): a function
//! declares its input/output signals once at configure time, then is
//! invoked once per cycle with no further negotiation.

use crate::error::Result;
use crate::memory::MemoryOwner;
use crate::signal::SignalDescriptor;

/// A unit of periodic computation bound to one or more threads via its
/// signal declarations.
pub trait Function: MemoryOwner {
    /// Unique name within the application.
    fn name(&self) -> &str;

    /// The signals this function reads and writes, declared once.
    fn signals(&self) -> &[SignalDescriptor];

    /// Called once after brokers are bound, before the owning thread's
    /// first cycle, so the function can validate its bound memory shape.
    fn setup(&self) -> Result<()> {
        Ok(())
    }

    /// Run one cycle. Called with input brokers already having copied into
    /// function memory; output brokers copy out after this returns.
    fn execute(&self) -> Result<()>;
}
