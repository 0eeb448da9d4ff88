//! Memory ownership contract shared by data sources and functions.
//!
//! MARTe2's `DataSourceI`/`GAM` pair exchange raw pointers obtained once at
//! configure time and held for a state's lifetime (spec §3, "Ownership").
//! A raw pointer is not `Send + Sync` without `unsafe`, and the redesign
//! note in spec §9 ("deep virtual hierarchies ... open capability
//! interface") asks for a tagged, capability-shaped contract instead — so
//! here the "address" a broker copy descriptor carries is an opaque token
//! (`MemoryAddress`) resolved back through the owning trait object's
//! `read_bytes`/`write_bytes`, never a raw pointer. A byte offset within
//! the addressed signal lets the broker planner expand a range mask into
//! sub-signal copies without a second indirection layer.

use std::sync::{Arc, Mutex};

/// An opaque handle into a `MemoryOwner`'s signal storage. The broker
/// runtime threads this through planner-built copy descriptors; it never
/// interprets the value itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryAddress(pub usize);

/// Anything that owns addressable signal storage: a data source's signal
/// buffers, or a function's own input/output signal memory.
pub trait MemoryOwner: Send + Sync {
    /// Address of `signal_index`'s storage within buffer `buffer_index`
    /// (functions, which have no data-source-style multi-buffering, use
    /// `buffer_index` as a sample-history slot instead, always 0 for
    /// signals declared with `samples == 1`).
    fn signal_memory(&self, signal_index: usize, buffer_index: u32) -> Option<MemoryAddress>;

    /// Copy bytes starting at `offset` within `address` into `buf`, filling
    /// as many of `buf`'s bytes as the underlying slot has available.
    /// Never allocates: the caller owns `buf`'s storage, typically a
    /// scratch buffer sized once at plan time.
    fn read_bytes(&self, address: MemoryAddress, offset: usize, buf: &mut [u8]);

    /// Copy `data` into `address` starting at `offset`, overwriting what
    /// was there.
    fn write_bytes(&self, address: MemoryAddress, offset: usize, data: &[u8]);
}

/// A straightforward `MemoryOwner`: one `Vec<u8>` per signal, optionally
/// repeated across `B` buffers. Used by test fixtures and example data
/// sources/functions; grounded on the "growable-buffer abstraction with
/// explicit capacity" redesign note in spec §9 for the `StaticList`/raw
/// array-and-size pattern.
#[derive(Debug)]
pub struct SimpleMemory {
    buffers: Vec<Vec<Mutex<Vec<u8>>>>,
}

impl SimpleMemory {
    /// Allocate `buffer_count` buffers, each with one zeroed slot per
    /// entry in `signal_byte_lens`.
    pub fn new(buffer_count: u32, signal_byte_lens: &[usize]) -> Arc<Self> {
        let buffers = (0..buffer_count.max(1))
            .map(|_| signal_byte_lens.iter().map(|len| Mutex::new(vec![0u8; *len])).collect())
            .collect();
        Arc::new(Self { buffers })
    }

    /// Number of buffers this memory was allocated with.
    pub fn buffer_count(&self) -> u32 {
        self.buffers.len() as u32
    }

    fn encode(&self, signal_index: usize, buffer_index: u32) -> MemoryAddress {
        MemoryAddress(buffer_index as usize * self.buffers[0].len() + signal_index)
    }

    fn decode(&self, address: MemoryAddress) -> (usize, usize) {
        let per_buffer = self.buffers[0].len();
        (address.0 / per_buffer, address.0 % per_buffer)
    }
}

impl MemoryOwner for SimpleMemory {
    fn signal_memory(&self, signal_index: usize, buffer_index: u32) -> Option<MemoryAddress> {
        let buffers = self.buffers.get(buffer_index as usize)?;
        if signal_index >= buffers.len() {
            return None;
        }
        Some(self.encode(signal_index, buffer_index))
    }

    fn read_bytes(&self, address: MemoryAddress, offset: usize, buf: &mut [u8]) {
        let (buffer_index, signal_index) = self.decode(address);
        let slot = self.buffers[buffer_index][signal_index].lock().expect("memory lock poisoned");
        let end = (offset + buf.len()).min(slot.len());
        if offset >= end {
            return;
        }
        let n = end - offset;
        buf[..n].copy_from_slice(&slot[offset..end]);
    }

    fn write_bytes(&self, address: MemoryAddress, offset: usize, data: &[u8]) {
        let (buffer_index, signal_index) = self.decode(address);
        let mut slot = self.buffers[buffer_index][signal_index].lock().expect("memory lock poisoned");
        let end = (offset + data.len()).min(slot.len());
        if offset >= end {
            return;
        }
        let n = end - offset;
        slot[offset..end].copy_from_slice(&data[..n]);
    }
}
