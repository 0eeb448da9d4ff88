//! `prepare_state` applies a signal's declared default value to its data
//! source before any thread of the prepared state runs, and skips
//! functions already active in the previous state so a live transition
//! doesn't clobber values already in flight.

use std::collections::HashMap;
use std::sync::Arc;

use rtc_model::{
    DataSource, Direction, Dimensionality, ElementType, Function, MemoryAddress, MemoryOwner, Result, Scalar,
    SignalDescriptor, SimpleMemory, TypedValue,
};
use rtc_scheduler::{prepare_state, StateDescriptor, ThreadDescriptor};

struct FixedDataSource {
    name: String,
    memory: Arc<SimpleMemory>,
}

impl FixedDataSource {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(Self { name: name.to_string(), memory: SimpleMemory::new(1, &[4]) })
    }

    fn read_u32(&self) -> u32 {
        let addr = self.memory.signal_memory(0, 0).unwrap();
        let mut buf = [0u8; 4];
        self.memory.read_bytes(addr, 0, &mut buf);
        u32::from_le_bytes(buf)
    }
}

impl MemoryOwner for FixedDataSource {
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

impl DataSource for FixedDataSource {
    fn name(&self) -> &str {
        &self.name
    }
    fn signal_index(&self, _name: &str) -> Option<usize> {
        Some(0)
    }
}

struct DefaultedFunction {
    name: String,
    signals: Vec<SignalDescriptor>,
    memory: Arc<SimpleMemory>,
}

impl DefaultedFunction {
    fn new(name: &str, data_source: &str, default: u32) -> Arc<Self> {
        let signal = SignalDescriptor {
            name: "s".to_string(),
            alias: None,
            data_source: data_source.to_string(),
            direction: Direction::Input,
            element_type: ElementType::U32,
            dimensionality: Dimensionality::Scalar,
            element_count: 1,
            samples_per_cycle: 1,
            frequency_hz: None,
            default_value: Some(TypedValue::scalar(ElementType::U32, Scalar::U32(default))),
            range_mask: None,
            pre_trigger_buffers: None,
            post_trigger_buffers: None,
        };
        Arc::new(Self { name: name.to_string(), signals: vec![signal], memory: SimpleMemory::new(1, &[4]) })
    }
}

impl MemoryOwner for DefaultedFunction {
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

impl Function for DefaultedFunction {
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

#[test]
fn prepare_applies_default_value_to_the_data_source() {
    let d1 = FixedDataSource::new("D1");
    let f1 = DefaultedFunction::new("F1", "D1", 0xCAFEu32);

    let mut functions: HashMap<String, Arc<dyn Function>> = HashMap::new();
    functions.insert("F1".to_string(), f1);
    let mut data_sources: HashMap<String, Arc<dyn DataSource>> = HashMap::new();
    data_sources.insert("D1".to_string(), d1.clone());

    let state = StateDescriptor::new("S1", vec![ThreadDescriptor::new("T1", vec!["F1".to_string()])]);

    assert_eq!(d1.read_u32(), 0);
    prepare_state(&state, &functions, &data_sources, None).unwrap();
    assert_eq!(d1.read_u32(), 0xCAFE);
}

#[test]
fn prepare_skips_defaults_for_functions_already_active_in_the_previous_state() {
    let d1 = FixedDataSource::new("D1");
    let f1 = DefaultedFunction::new("F1", "D1", 0xCAFEu32);

    let mut functions: HashMap<String, Arc<dyn Function>> = HashMap::new();
    functions.insert("F1".to_string(), f1);
    let mut data_sources: HashMap<String, Arc<dyn DataSource>> = HashMap::new();
    data_sources.insert("D1".to_string(), d1.clone());

    let state = StateDescriptor::new("S1", vec![ThreadDescriptor::new("T1", vec!["F1".to_string()])]);

    prepare_state(&state, &functions, &data_sources, None).unwrap();
    assert_eq!(d1.read_u32(), 0xCAFE);

    // A live value written after prepare must survive a transition back to
    // a state where F1 was already running.
    let addr = d1.memory.signal_memory(0, 0).unwrap();
    d1.memory.write_bytes(addr, 0, &0x1234u32.to_le_bytes());
    prepare_state(&state, &functions, &data_sources, Some(&state)).unwrap();
    assert_eq!(d1.read_u32(), 0x1234);
}
