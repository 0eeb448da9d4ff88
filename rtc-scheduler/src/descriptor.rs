//! State and thread descriptors (spec §3's "State descriptor", §4.5).

/// One real-time thread within a state: its function pipeline order and
/// (optionally) the data source allowed to block it.
#[derive(Debug, Clone)]
pub struct ThreadDescriptor {
    pub name: String,
    pub cpu_affinity: Option<Vec<u32>>,
    pub stack_size: Option<usize>,
    pub function_names: Vec<String>,
    pub synchronising_data_source: Option<String>,
}

impl ThreadDescriptor {
    pub fn new(name: impl Into<String>, function_names: Vec<String>) -> Self {
        Self { name: name.into(), cpu_affinity: None, stack_size: None, function_names, synchronising_data_source: None }
    }
}

/// A named wiring of threads (spec §4.5); the scheduler runs exactly one at
/// a time.
#[derive(Debug, Clone)]
pub struct StateDescriptor {
    pub name: String,
    pub threads: Vec<ThreadDescriptor>,
}

impl StateDescriptor {
    pub fn new(name: impl Into<String>, threads: Vec<ThreadDescriptor>) -> Self {
        Self { name: name.into(), threads }
    }
}
