//! Exercises the full `configure -> start -> send -> stop` lifecycle
//! against a small in-memory configuration, including the message-driven
//! state machine (E6-style) riding alongside the running scheduler.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rtc_app::{Application, ApplicationError, ApplicationParts, Lifecycle};
use rtc_model::{
    ConfigNode, DataSource, Dimensionality, Direction, ElementType, Function, MemoryAddress, MemoryOwner, Result,
    SignalDescriptor, SimpleMemory,
};
use rtc_scheduler::{Message, MessageBus, MessageOutcome, StateDescriptor, StateMachineSpec, ThreadDescriptor, TransitionSpec};

struct FixedDataSource {
    name: String,
    memory: Arc<SimpleMemory>,
}

impl FixedDataSource {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(Self { name: name.to_string(), memory: SimpleMemory::new(1, &[4]) })
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

struct NoopFunction {
    name: String,
    signals: Vec<SignalDescriptor>,
    memory: Arc<SimpleMemory>,
}

impl NoopFunction {
    fn new(name: &str, data_source: &str) -> Arc<Self> {
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
            default_value: None,
            range_mask: None,
            pre_trigger_buffers: None,
            post_trigger_buffers: None,
        };
        Arc::new(Self { name: name.to_string(), signals: vec![signal], memory: SimpleMemory::new(1, &[4]) })
    }
}

impl MemoryOwner for NoopFunction {
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

impl Function for NoopFunction {
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

struct RecordingBus {
    delivered: Mutex<Vec<String>>,
}

impl MessageBus for RecordingBus {
    fn send(&self, message: &Message) -> MessageOutcome {
        self.delivered.lock().unwrap().push(message.function.clone());
        MessageOutcome::Success
    }
}

fn demo_parts(state_machine: Option<(StateMachineSpec, Arc<dyn MessageBus>)>) -> ApplicationParts {
    let d1 = FixedDataSource::new("D1");
    let f1 = NoopFunction::new("F1", "D1");

    let mut functions: HashMap<String, Arc<dyn Function>> = HashMap::new();
    functions.insert("F1".to_string(), f1);
    let mut data_sources: HashMap<String, Arc<dyn DataSource>> = HashMap::new();
    data_sources.insert("D1".to_string(), d1);

    let state = StateDescriptor::new("Running", vec![ThreadDescriptor::new("T1", vec!["F1".to_string()])]);
    let mut states = HashMap::new();
    states.insert("Running".to_string(), state);

    ApplicationParts { functions, data_sources, states, initial_state: "Running".to_string(), state_machine }
}

#[test]
fn configure_rejects_unknown_function_reference() {
    let mut parts = demo_parts(None);
    parts
        .states
        .get_mut("Running")
        .unwrap()
        .threads
        .push(ThreadDescriptor::new("T2", vec!["DoesNotExist".to_string()]));

    let err = Application::configure(ConfigNode::new(), parts).unwrap_err();
    assert!(matches!(err, rtc_app::ConfigurationError::UnknownFunction(name) if name == "DoesNotExist"));
}

#[test]
fn full_lifecycle_runs_and_stops_cleanly() {
    let app = Application::configure(ConfigNode::new(), demo_parts(None)).unwrap();
    assert_eq!(app.lifecycle(), Lifecycle::Configured);

    app.start(Duration::from_millis(200)).unwrap();
    assert_eq!(app.lifecycle(), Lifecycle::Running);
    thread::sleep(Duration::from_millis(20));

    app.stop().unwrap();
    assert_eq!(app.lifecycle(), Lifecycle::Stopped);
}

#[test]
fn send_without_a_state_machine_is_rejected() {
    let app = Application::configure(ConfigNode::new(), demo_parts(None)).unwrap();
    app.start(Duration::from_millis(200)).unwrap();

    let err = app.send("Go").unwrap_err();
    assert!(matches!(err, ApplicationError::WrongLifecycleStage { .. }));
    app.stop().unwrap();
}

#[test]
fn send_fires_a_configured_state_machine_event() {
    let bus = Arc::new(RecordingBus { delivered: Mutex::new(Vec::new()) });
    let mut states = HashMap::new();
    let mut events = HashMap::new();
    events.insert(
        "Go".to_string(),
        TransitionSpec {
            next_state_success: "Done".to_string(),
            next_state_error: "Error".to_string(),
            timeout: Duration::from_secs(1),
            messages: vec![Message {
                sender: "test".to_string(),
                destination: "observer".to_string(),
                function: "notify".to_string(),
                payload: None,
                expects_reply: true,
                timeout: Duration::from_millis(100),
            }],
        },
    );
    states.insert("Idle".to_string(), events);
    let spec = StateMachineSpec { initial_state: "Idle".to_string(), states };

    let app = Application::configure(ConfigNode::new(), demo_parts(Some((spec, bus.clone())))).unwrap();
    app.start(Duration::from_millis(200)).unwrap();

    app.send("Go").unwrap();
    let deadline = std::time::Instant::now() + Duration::from_secs(1);
    while bus.delivered.lock().unwrap().is_empty() && std::time::Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(bus.delivered.lock().unwrap().as_slice(), ["notify".to_string()]);

    app.stop().unwrap();
}

#[test]
fn operations_out_of_order_are_rejected() {
    let app = Application::configure(ConfigNode::new(), demo_parts(None)).unwrap();
    let err = app.transition_to("Running", Duration::from_millis(50)).unwrap_err();
    assert!(matches!(err, ApplicationError::WrongLifecycleStage { .. }));
}
