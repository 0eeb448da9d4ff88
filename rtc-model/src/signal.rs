//! Signal descriptors: per-function, per-direction declarations of the
//! data a function exchanges with a data source.

use crate::error::{ModelError, Result};
use crate::value::{Dimensionality, ElementType, TypedValue};

/// The direction of a signal relative to the function that declares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Function reads this signal from a data source.
    Input,
    /// Function writes this signal to a data source.
    Output,
}

/// A half-open... no: an inclusive `[lo, hi]` element-index interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementRange {
    /// Inclusive lower bound.
    pub lo: u32,
    /// Inclusive upper bound.
    pub hi: u32,
}

impl ElementRange {
    /// Construct a range, panicking if `lo > hi` (a configure-time bug,
    /// not a runtime condition).
    pub fn new(lo: u32, hi: u32) -> Self {
        assert!(lo <= hi, "range lower bound must not exceed upper bound");
        Self { lo, hi }
    }

    /// Number of elements covered.
    pub fn len(&self) -> u32 {
        self.hi - self.lo + 1
    }

    /// True if empty (never true for a well-formed range; kept for API
    /// symmetry).
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// A sorted, disjoint list of element-index intervals restricting a copy
/// to a subset of a signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeMask {
    intervals: Vec<ElementRange>,
}

impl RangeMask {
    /// Validate and construct a range mask. Intervals must be given in
    /// sorted, disjoint order and must fit within `[0, extent)`.
    pub fn new(intervals: Vec<ElementRange>, extent: u32) -> Result<Self> {
        let mut prev_hi: Option<u32> = None;
        for r in &intervals {
            if r.hi >= extent {
                return Err(ModelError::RangeOutOfExtent { lo: r.lo, hi: r.hi, extent });
            }
            if let Some(prev_hi) = prev_hi {
                if r.lo <= prev_hi {
                    return Err(ModelError::RangeNotDisjoint);
                }
            }
            prev_hi = Some(r.hi);
        }
        Ok(Self { intervals })
    }

    /// The intervals, in sorted order.
    pub fn intervals(&self) -> &[ElementRange] {
        &self.intervals
    }

    /// Total element count covered by this mask.
    pub fn element_count(&self) -> u32 {
        self.intervals.iter().map(ElementRange::len).sum()
    }
}

/// A per-function, per-direction signal declaration.
#[derive(Debug, Clone)]
pub struct SignalDescriptor {
    /// Signal name as known to the function.
    pub name: String,
    /// Name in the data source, if different from `name`.
    pub alias: Option<String>,
    /// Owning data source name.
    pub data_source: String,
    /// Direction relative to the declaring function.
    pub direction: Direction,
    /// Declared element type on the function side.
    pub element_type: ElementType,
    /// Declared dimensionality.
    pub dimensionality: Dimensionality,
    /// Total element count (product of extents, or 1 for scalars).
    pub element_count: u32,
    /// Samples exchanged per cycle (> 1 selects the multi-buffer broker).
    pub samples_per_cycle: u32,
    /// Frequency in Hz; `Some` marks this the thread's synchronising
    /// signal.
    pub frequency_hz: Option<f64>,
    /// Default value applied on first prepare.
    pub default_value: Option<TypedValue>,
    /// Optional element-index subset restricting the copy.
    pub range_mask: Option<RangeMask>,
    /// Declares pre-trigger capture depth (output signals only).
    pub pre_trigger_buffers: Option<u32>,
    /// Declares post-trigger capture depth (output signals only).
    pub post_trigger_buffers: Option<u32>,
}

impl SignalDescriptor {
    /// The name used to look the signal up in the data source: the alias
    /// if declared, otherwise the function-side name.
    pub fn data_source_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// True if this is the (at most one per thread) synchronising signal.
    pub fn is_synchronising(&self) -> bool {
        self.frequency_hz.is_some()
    }

    /// True if this signal requests triggered capture.
    pub fn is_triggered(&self) -> bool {
        self.pre_trigger_buffers.is_some() || self.post_trigger_buffers.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_mask_rejects_overlap() {
        let err = RangeMask::new(vec![ElementRange::new(0, 5), ElementRange::new(5, 9)], 10).unwrap_err();
        assert_eq!(err, ModelError::RangeNotDisjoint);
    }

    #[test]
    fn range_mask_rejects_out_of_extent() {
        let err = RangeMask::new(vec![ElementRange::new(8, 12)], 10).unwrap_err();
        assert_eq!(err, ModelError::RangeOutOfExtent { lo: 8, hi: 12, extent: 10 });
    }

    #[test]
    fn range_mask_accepts_sorted_disjoint() {
        let mask = RangeMask::new(
            vec![ElementRange::new(0, 0), ElementRange::new(2, 5), ElementRange::new(9, 9)],
            10,
        )
        .unwrap();
        assert_eq!(mask.element_count(), 6);
    }
}
