//! Administrative CLI for a running application instance: `configure`,
//! `start`, `send`, `stop`, as spec §6's entry points.
//!
//! Instantiating real `Function`/`DataSource` drivers from a configuration
//! tree's `Class` fields is an object-registry concern the core does not
//! provide (see `rtc_app::lifecycle`'s module doc); this binary wires a
//! small built-in pass-through function/data-source pair so the full
//! lifecycle can be exercised end to end from a fixture file.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rtc_app::{Application, ApplicationParts};
use rtc_model::{fixtures, DataSource, Function, MemoryAddress, MemoryOwner, Result as ModelResult, SimpleMemory};
use rtc_scheduler::{StateDescriptor, ThreadDescriptor};

#[derive(Parser)]
#[command(name = "rtcyclic")]
#[command(about = "Run and administer a real-time cyclic execution instance")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a fixture tree, configure a demo application, and run its
    /// initial state for a fixed duration before stopping cleanly.
    Run {
        /// Path to a JSON fixture tree (see `rtc_model::fixtures`).
        #[arg(long)]
        config: PathBuf,

        /// How long to let the initial state run before stopping.
        #[arg(long, default_value = "200")]
        run_millis: u64,
    },

    /// Load a fixture tree and report whether it configures without
    /// starting anything.
    Validate {
        #[arg(long)]
        config: PathBuf,
    },
}

/// A demo function that reads one scalar input and writes it unchanged to
/// a second data source, so `run` has something observable to do.
struct PassThrough {
    signals: Vec<rtc_model::SignalDescriptor>,
    memory: Arc<SimpleMemory>,
}

impl PassThrough {
    fn new(input_source: &str, output_source: &str) -> Arc<Self> {
        let input = rtc_model::SignalDescriptor {
            name: "in".to_string(),
            alias: None,
            data_source: input_source.to_string(),
            direction: rtc_model::Direction::Input,
            element_type: rtc_model::ElementType::U32,
            dimensionality: rtc_model::Dimensionality::Scalar,
            element_count: 1,
            samples_per_cycle: 1,
            frequency_hz: None,
            default_value: None,
            range_mask: None,
            pre_trigger_buffers: None,
            post_trigger_buffers: None,
        };
        let mut output = input.clone();
        output.name = "out".to_string();
        output.data_source = output_source.to_string();
        output.direction = rtc_model::Direction::Output;
        Arc::new(Self { signals: vec![input, output], memory: SimpleMemory::new(2, &[4, 4]) })
    }
}

impl MemoryOwner for PassThrough {
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

impl Function for PassThrough {
    fn name(&self) -> &str {
        "PassThrough"
    }
    fn signals(&self) -> &[rtc_model::SignalDescriptor] {
        &self.signals
    }
    fn execute(&self) -> ModelResult<()> {
        let mut buf = [0u8; 4];
        self.read_bytes(self.signal_memory(0, 0).unwrap(), 0, &mut buf);
        self.write_bytes(self.signal_memory(1, 0).unwrap(), 0, &buf);
        Ok(())
    }
}

struct DemoDataSource {
    name: String,
    memory: Arc<SimpleMemory>,
}

impl DemoDataSource {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(Self { name: name.to_string(), memory: SimpleMemory::new(1, &[4]) })
    }
}

impl MemoryOwner for DemoDataSource {
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

impl DataSource for DemoDataSource {
    fn name(&self) -> &str {
        &self.name
    }
    fn signal_index(&self, _name: &str) -> Option<usize> {
        Some(0)
    }
    fn signal_shape(&self, _signal_index: usize) -> Option<(rtc_model::ElementType, u32)> {
        Some((rtc_model::ElementType::U32, 1))
    }
}

fn build_demo_parts() -> ApplicationParts {
    let d1 = DemoDataSource::new("D1");
    let d2 = DemoDataSource::new("D2");
    let f1 = PassThrough::new("D1", "D2");

    let mut functions: HashMap<String, Arc<dyn Function>> = HashMap::new();
    functions.insert("PassThrough".to_string(), f1);
    let mut data_sources: HashMap<String, Arc<dyn DataSource>> = HashMap::new();
    data_sources.insert("D1".to_string(), d1);
    data_sources.insert("D2".to_string(), d2);

    let state = StateDescriptor::new("Running", vec![ThreadDescriptor::new("T1", vec!["PassThrough".to_string()])]);
    let mut states = HashMap::new();
    states.insert("Running".to_string(), state);

    ApplicationParts { functions, data_sources, states, initial_state: "Running".to_string(), state_machine: None }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Validate { config } => {
            let tree = fixtures::load_tree(&config)?;
            let parts = build_demo_parts();
            Application::configure(tree, parts)?;
            println!("configuration is valid");
        }
        Command::Run { config, run_millis } => {
            let tree = fixtures::load_tree(&config)?;
            let parts = build_demo_parts();
            let app = Application::configure(tree, parts)?;
            app.start(Duration::from_millis(500))?;
            std::thread::sleep(Duration::from_millis(run_millis));
            app.stop()?;
            println!("ran for {run_millis}ms and stopped cleanly");
        }
    }
    Ok(())
}
