//! Shared test fixtures: a plain `Vec<u8>`-backed data source and function,
//! built on `rtc_model::SimpleMemory`.

use std::sync::Arc;

use rtc_model::{DataSource, ElementType, Function, MemoryAddress, MemoryOwner, Result, SignalDescriptor, SimpleMemory};

pub struct TestDataSource {
    name: String,
    memory: Arc<SimpleMemory>,
    signal_names: Vec<String>,
    accepts_triggered: bool,
}

impl TestDataSource {
    pub fn new(name: &str, buffer_count: u32, signal_byte_lens: &[usize], signal_names: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            memory: SimpleMemory::new(buffer_count, signal_byte_lens),
            signal_names: signal_names.iter().map(|s| s.to_string()).collect(),
            accepts_triggered: false,
        })
    }

    pub fn with_triggered_writes(name: &str, buffer_count: u32, signal_byte_lens: &[usize], signal_names: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            memory: SimpleMemory::new(buffer_count, signal_byte_lens),
            signal_names: signal_names.iter().map(|s| s.to_string()).collect(),
            accepts_triggered: true,
        })
    }

    pub fn write_buffer(&self, signal_index: usize, buffer_index: u32, bytes: &[u8]) {
        let addr = self.memory.signal_memory(signal_index, buffer_index).expect("signal/buffer out of range");
        self.memory.write_bytes(addr, 0, bytes);
    }

    pub fn read_buffer(&self, signal_index: usize, buffer_index: u32, len: usize) -> Vec<u8> {
        let addr = self.memory.signal_memory(signal_index, buffer_index).expect("signal/buffer out of range");
        let mut buf = vec![0u8; len];
        self.memory.read_bytes(addr, 0, &mut buf);
        buf
    }
}

impl MemoryOwner for TestDataSource {
    fn signal_memory(&self, signal_index: usize, buffer_index: u32) -> Option<MemoryAddress> {
        self.memory.signal_memory(signal_index, buffer_index)
    }
    fn read_bytes(&self, address: MemoryAddress, offset: usize, buf: &mut [u8]) {
        self.memory.read_bytes(address, offset, buf)
    }
    fn write_bytes(&self, address: MemoryAddress, offset: usize, data: &[u8]) {
        self.memory.write_bytes(address, offset, data)
    }
}

impl DataSource for TestDataSource {
    fn name(&self) -> &str {
        &self.name
    }
    fn signal_index(&self, name: &str) -> Option<usize> {
        self.signal_names.iter().position(|s| s == name)
    }
    fn number_of_memory_buffers(&self) -> u32 {
        self.memory.buffer_count()
    }
    fn accepts_triggered_writes(&self) -> bool {
        self.accepts_triggered
    }
}

pub struct TestFunction {
    name: String,
    signals: Vec<SignalDescriptor>,
    memory: Arc<SimpleMemory>,
}

impl TestFunction {
    /// `buffer_count` is the number of sample-history slots reserved per
    /// signal (1 unless a signal declares `samples_per_cycle > 1`).
    pub fn new(name: &str, signals: Vec<SignalDescriptor>, buffer_count: u32, signal_byte_lens: &[usize]) -> Arc<Self> {
        Arc::new(Self { name: name.to_string(), signals, memory: SimpleMemory::new(buffer_count, signal_byte_lens) })
    }

    pub fn read_signal(&self, signal_index: usize, buffer_index: u32, len: usize) -> Vec<u8> {
        let addr = self.memory.signal_memory(signal_index, buffer_index).expect("signal/buffer out of range");
        let mut buf = vec![0u8; len];
        self.memory.read_bytes(addr, 0, &mut buf);
        buf
    }

    pub fn write_signal(&self, signal_index: usize, buffer_index: u32, bytes: &[u8]) {
        let addr = self.memory.signal_memory(signal_index, buffer_index).expect("signal/buffer out of range");
        self.memory.write_bytes(addr, 0, bytes);
    }
}

impl MemoryOwner for TestFunction {
    fn signal_memory(&self, signal_index: usize, buffer_index: u32) -> Option<MemoryAddress> {
        self.memory.signal_memory(signal_index, buffer_index)
    }
    fn read_bytes(&self, address: MemoryAddress, offset: usize, buf: &mut [u8]) {
        self.memory.read_bytes(address, offset, buf)
    }
    fn write_bytes(&self, address: MemoryAddress, offset: usize, data: &[u8]) {
        self.memory.write_bytes(address, offset, data)
    }
}

impl Function for TestFunction {
    fn name(&self) -> &str {
        &self.name
    }
    fn signals(&self) -> &[SignalDescriptor] {
        &self.signals
    }
    fn execute(&self) -> Result<()> {
        Ok(())
    }
}

pub fn u32_signal(name: &str, data_source: &str, direction: rtc_model::Direction) -> SignalDescriptor {
    SignalDescriptor {
        name: name.to_string(),
        alias: None,
        data_source: data_source.to_string(),
        direction,
        element_type: ElementType::U32,
        dimensionality: rtc_model::Dimensionality::Scalar,
        element_count: 1,
        samples_per_cycle: 1,
        frequency_hz: None,
        default_value: None,
        range_mask: None,
        pre_trigger_buffers: None,
        post_trigger_buffers: None,
    }
}
