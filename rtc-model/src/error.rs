//! Error types for the typed value, configuration tree and signal catalogue.

use thiserror::Error;

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised while building or reading the typed model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A configure-time reference to a signal that does not exist.
    #[error("unknown signal '{0}'")]
    UnknownSignal(String),

    /// A type conversion that would lose information.
    #[error("type mismatch: cannot losslessly convert {from:?} to {to:?}")]
    TypeMismatch {
        /// Source element type.
        from: String,
        /// Target element type.
        to: String,
    },

    /// Declared dimensionality/extents do not match the data.
    #[error("dimension mismatch: expected {expected} elements, got {actual}")]
    DimensionMismatch {
        /// Expected element count.
        expected: usize,
        /// Actual element count.
        actual: usize,
    },

    /// A range-mask interval falls outside the signal's element extent.
    #[error("range [{lo},{hi}] is out of extent (0..{extent})")]
    RangeOutOfExtent {
        /// Interval low bound.
        lo: u32,
        /// Interval high bound.
        hi: u32,
        /// Element extent of the signal.
        extent: u32,
    },

    /// Range-mask intervals were not sorted and disjoint.
    #[error("range mask intervals must be sorted and disjoint")]
    RangeNotDisjoint,

    /// A numeric conversion would overflow the target type.
    #[error("numeric value out of range for target type")]
    NumericOverflow,

    /// Malformed textual literal for a typed value.
    #[error("cannot parse '{text}' as {element_type}")]
    BadLiteral {
        /// Offending text.
        text: String,
        /// Element type it was parsed against.
        element_type: String,
    },

    /// Byte buffer length did not match the declared shape/type.
    #[error("byte buffer length {actual} does not match expected {expected}")]
    BadByteLength {
        /// Expected byte length.
        expected: usize,
        /// Actual byte length.
        actual: usize,
    },

    /// Duplicate key insertion at one tree level.
    #[error("duplicate key '{0}' at this level")]
    DuplicateKey(String),

    /// Navigation to a child, parent, or absolute path that does not exist.
    #[error("no such node: {0}")]
    NoSuchNode(String),

    /// Read/write attempted on a node with no value / already holding children.
    #[error("node '{0}' holds no scalar value")]
    NotALeaf(String),
}
