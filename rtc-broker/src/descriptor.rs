//! Dense copy descriptors: the planner's sole output besides the broker
//! class tag. Grounded on spec §3's "Copy descriptor" and §8's P1/P2/P3.

use std::sync::{Arc, Mutex};

use rtc_model::{Direction, MemoryOwner};

/// A single unconditional byte copy between two addressed signal slots.
/// Used by `DirectCopy` (one per signal, or one per range-mask interval)
/// and as the fixed-address half of `SynchronisingInput`/`SynchronisingOutput`.
/// The scratch buffer is sized once at construction so `execute` never
/// allocates on the real-time thread.
pub struct CopyDescriptor {
    pub source: Arc<dyn MemoryOwner>,
    pub source_signal: usize,
    pub source_offset: usize,
    pub destination: Arc<dyn MemoryOwner>,
    pub destination_signal: usize,
    pub destination_offset: usize,
    pub byte_count: usize,
    scratch: Mutex<Vec<u8>>,
}

impl CopyDescriptor {
    /// Build a descriptor, allocating its `byte_count`-sized scratch
    /// buffer once, up front.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Arc<dyn MemoryOwner>,
        source_signal: usize,
        source_offset: usize,
        destination: Arc<dyn MemoryOwner>,
        destination_signal: usize,
        destination_offset: usize,
        byte_count: usize,
    ) -> Self {
        Self {
            source,
            source_signal,
            source_offset,
            destination,
            destination_signal,
            destination_offset,
            byte_count,
            scratch: Mutex::new(vec![0u8; byte_count]),
        }
    }

    /// Execute the copy. Returns `false` if either side's address cannot
    /// be resolved (a configure-time invariant violation surfacing late).
    pub fn execute(&self) -> bool {
        let (Some(src), Some(dst)) =
            (self.source.signal_memory(self.source_signal, 0), self.destination.signal_memory(self.destination_signal, 0))
        else {
            return false;
        };
        let mut scratch = self.scratch.lock().expect("copy descriptor scratch poisoned");
        self.source.read_bytes(src, self.source_offset, &mut scratch);
        self.destination.write_bytes(dst, self.destination_offset, &scratch);
        true
    }
}

/// One sample-history slot of a `MultiBuffer` broker: the data-source
/// address is recomputed from the cycle counter each time, per spec
/// §4.4; the function-side address is a fixed history slot (buffer index
/// `offset` into the function's own `MemoryOwner`).
pub struct MultiBufferEntry {
    pub function: Arc<dyn MemoryOwner>,
    pub function_signal: usize,
    pub data_source: Arc<dyn MemoryOwner>,
    pub data_source_signal: usize,
    pub buffer_count: u32,
    pub offset: u32,
    pub byte_count: usize,
    pub direction: Direction,
    scratch: Mutex<Vec<u8>>,
}

impl MultiBufferEntry {
    /// Build an entry, allocating its `byte_count`-sized scratch buffer
    /// once, up front.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        function: Arc<dyn MemoryOwner>,
        function_signal: usize,
        data_source: Arc<dyn MemoryOwner>,
        data_source_signal: usize,
        buffer_count: u32,
        offset: u32,
        byte_count: usize,
        direction: Direction,
    ) -> Self {
        Self {
            function,
            function_signal,
            data_source,
            data_source_signal,
            buffer_count,
            offset,
            byte_count,
            direction,
            scratch: Mutex::new(vec![0u8; byte_count]),
        }
    }

    /// Execute this entry's copy for cycle `cycle`.
    pub fn execute(&self, cycle: u64) -> bool {
        let buffer_count = self.buffer_count as i64;
        let ds_buffer = match self.direction {
            Direction::Input => (cycle as i64 - self.offset as i64).rem_euclid(buffer_count) as u32,
            Direction::Output => (cycle as i64 + self.offset as i64).rem_euclid(buffer_count) as u32,
        };
        let Some(fn_addr) = self.function.signal_memory(self.function_signal, self.offset) else {
            return false;
        };
        let Some(ds_addr) = self.data_source.signal_memory(self.data_source_signal, ds_buffer) else {
            return false;
        };
        let mut scratch = self.scratch.lock().expect("multi buffer entry scratch poisoned");
        match self.direction {
            Direction::Input => {
                self.data_source.read_bytes(ds_addr, 0, &mut scratch);
                self.function.write_bytes(fn_addr, 0, &scratch);
            }
            Direction::Output => {
                self.function.read_bytes(fn_addr, 0, &mut scratch);
                self.data_source.write_bytes(ds_addr, 0, &scratch);
            }
        }
        true
    }
}
