//! Typed values, the configuration tree, and the signal/broker/function
//! vocabulary shared by the planner, the broker runtime, and the
//! scheduler.

pub mod broker_class;
pub mod datasource;
pub mod error;
#[cfg(feature = "fixtures")]
pub mod fixtures;
pub mod function;
pub mod memory;
pub mod signal;
pub mod tree;
pub mod value;

pub use broker_class::BrokerClass;
pub use datasource::DataSource;
pub use error::{ModelError, Result};
pub use function::Function;
pub use memory::{MemoryAddress, MemoryOwner, SimpleMemory};
pub use signal::{Direction, ElementRange, RangeMask, SignalDescriptor};
pub use tree::{ConfigNode, ConfigTree};
pub use value::{Dimensionality, ElementType, Endianness, Scalar, TypedValue};
