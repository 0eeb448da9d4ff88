//! The signal/broker planner: spec §4.3's offline pairing of function
//! signals to data-source memory.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rtc_model::{BrokerClass, DataSource, Direction, Function, MemoryOwner, ModelError, SignalDescriptor};
use tracing::info;

use crate::broker::Broker;
use crate::descriptor::{CopyDescriptor, MultiBufferEntry};
use crate::error::{PlanError, PlanResult};
use crate::trigger::{spawn_consumer, TriggerOutputBroker, TriggerRing};

/// The brokers planned for one function, split by direction — matching
/// spec §2's per-cycle pseudocode's `brokers_in(F, S)` / `brokers_out(F, S)`.
pub struct FunctionBrokers {
    pub function_name: String,
    pub input_brokers: Vec<Broker>,
    pub output_brokers: Vec<Broker>,
    /// Background consumer services spawned for this function's triggered
    /// outputs; the scheduler owns and stops these alongside the state's
    /// real-time threads.
    pub trigger_consumers: Vec<rtc_concurrency::SingleThreadService>,
}

/// Inputs to one planning pass: the functions of a single state, the
/// thread each belongs to (for the synchronising-signal and
/// triggered-data-source uniqueness rules), and the data source registry.
pub struct PlannerInput<'a> {
    pub functions: &'a [Arc<dyn Function>],
    pub thread_of: &'a HashMap<String, String>,
    pub data_sources: &'a HashMap<String, Arc<dyn DataSource>>,
}

/// Run the planner over every function's declared signals.
pub fn plan(input: PlannerInput) -> PlanResult<Vec<FunctionBrokers>> {
    check_one_synchronising_signal_per_thread(input.functions, input.thread_of)?;
    check_one_function_per_triggered_data_source(input.functions)?;

    let mut out = Vec::with_capacity(input.functions.len());
    for function in input.functions {
        let mut input_brokers = Vec::new();
        let mut output_brokers = Vec::new();
        let mut trigger_consumers = Vec::new();
        for (signal_index, signal) in function.signals().iter().enumerate() {
            let data_source = input.data_sources.get(&signal.data_source).ok_or_else(|| PlanError::UnknownDataSource {
                signal: signal.name.clone(),
                data_source: signal.data_source.clone(),
            })?;
            let ds_signal_index =
                data_source.signal_index(signal.data_source_name()).ok_or_else(|| PlanError::UnknownSignal {
                    signal: signal.name.clone(),
                    data_source: signal.data_source.clone(),
                })?;

            let planned = plan_one_signal(function, signal_index, signal, data_source, ds_signal_index)?;
            info!(
                function = function.name(),
                signal = signal.name,
                direction = ?signal.direction,
                class = %broker_class_of(&planned.broker),
                "planned broker"
            );
            if let Some(consumer) = planned.trigger_consumer {
                trigger_consumers.push(consumer);
            }
            match signal.direction {
                Direction::Input => input_brokers.push(planned.broker),
                Direction::Output => output_brokers.push(planned.broker),
            }
        }
        out.push(FunctionBrokers {
            function_name: function.name().to_string(),
            input_brokers,
            output_brokers,
            trigger_consumers,
        });
    }
    Ok(out)
}

fn broker_class_of(broker: &Broker) -> &'static str {
    match broker {
        Broker::DirectCopy { .. } => "DirectCopy",
        Broker::MultiBuffer { .. } => "MultiBuffer",
        Broker::SynchronisingInput { .. } => "SynchronisingInput",
        Broker::SynchronisingOutput { .. } => "SynchronisingOutput",
        Broker::TriggerOutput(_) => "TriggerOutput",
    }
}

fn check_one_synchronising_signal_per_thread(
    functions: &[Arc<dyn Function>],
    thread_of: &HashMap<String, String>,
) -> PlanResult<()> {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for function in functions {
        let Some(thread) = thread_of.get(function.name()) else { continue };
        for signal in function.signals() {
            if !signal.is_synchronising() {
                continue;
            }
            if let Some(first) = seen.insert(thread.as_str(), signal.name.as_str()) {
                if first != signal.name {
                    return Err(PlanError::MultipleSynchronisingSignals {
                        thread: thread.clone(),
                        first: first.to_string(),
                        second: signal.name.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn check_one_function_per_triggered_data_source(functions: &[Arc<dyn Function>]) -> PlanResult<()> {
    let mut owner: HashMap<&str, &str> = HashMap::new();
    for function in functions {
        for signal in function.signals() {
            if signal.direction != Direction::Output || !signal.is_triggered() {
                continue;
            }
            if let Some(first) = owner.insert(signal.data_source.as_str(), function.name()) {
                if first != function.name() {
                    return Err(PlanError::MultipleFunctionsOnTriggeredDataSource(signal.data_source.clone()));
                }
            }
        }
    }
    Ok(())
}

struct PlannedSignal {
    broker: Broker,
    trigger_consumer: Option<rtc_concurrency::SingleThreadService>,
}

fn plan_one_signal(
    function: &Arc<dyn Function>,
    signal_index: usize,
    signal: &SignalDescriptor,
    data_source: &Arc<dyn DataSource>,
    ds_signal_index: usize,
) -> PlanResult<PlannedSignal> {
    if let Some((ds_type, ds_extent)) = data_source.signal_shape(ds_signal_index) {
        if ds_extent != signal.element_count {
            return Err(PlanError::Model(ModelError::DimensionMismatch {
                expected: ds_extent as usize,
                actual: signal.element_count as usize,
            }));
        }
        // The broker moves raw bytes with no transcoding, so a type
        // difference is only lossless when both sides share the same
        // element width; anything else would misalign subsequent
        // elements of a vector/matrix signal.
        if ds_type != signal.element_type && ds_type.byte_size() != signal.element_type.byte_size() {
            return Err(PlanError::Model(ModelError::TypeMismatch {
                from: ds_type.to_string(),
                to: signal.element_type.to_string(),
            }));
        }
    }

    let element_size = signal.element_type.byte_size();
    let byte_count = element_size * signal.element_count as usize;
    let function_owner: Arc<dyn MemoryOwner> = Arc::clone(function) as Arc<dyn MemoryOwner>;
    let ds_owner: Arc<dyn MemoryOwner> = Arc::clone(data_source) as Arc<dyn MemoryOwner>;

    if signal.is_triggered() && signal.direction == Direction::Output && data_source.accepts_triggered_writes() {
        let buffers = data_source.number_of_memory_buffers();
        let pre = signal.pre_trigger_buffers.unwrap_or(0);
        if pre >= buffers {
            return Err(PlanError::TriggeredOutputPreTooLarge {
                signal: signal.name.clone(),
                pre,
                data_source: signal.data_source.clone(),
                buffers,
            });
        }
        let post = signal.post_trigger_buffers.unwrap_or(0);
        let n = (pre + post + 2).max(buffers) as usize;
        let ring = TriggerRing::new(n, byte_count, pre, post, 0, signal.data_source.clone());
        let consumer =
            spawn_consumer(Arc::clone(&ring), Arc::clone(data_source), ds_signal_index, Duration::from_millis(50), Duration::from_secs(1));
        return Ok(PlannedSignal {
            broker: Broker::TriggerOutput(TriggerOutputBroker::new(ring, function_owner, signal_index, byte_count)),
            trigger_consumer: Some(consumer),
        });
    }

    if signal.direction == Direction::Input && matches!(data_source.preferred_broker(signal.direction), Some(BrokerClass::SynchronisingInput))
    {
        let copies = vec![CopyDescriptor::new(ds_owner, ds_signal_index, 0, function_owner, signal_index, 0, byte_count)];
        return Ok(PlannedSignal {
            broker: Broker::SynchronisingInput { signal_name: signal.name.clone(), data_source: Arc::clone(data_source), copies },
            trigger_consumer: None,
        });
    }
    if signal.direction == Direction::Output
        && matches!(data_source.preferred_broker(signal.direction), Some(BrokerClass::SynchronisingOutput))
    {
        let copies = vec![CopyDescriptor::new(function_owner, signal_index, 0, ds_owner, ds_signal_index, 0, byte_count)];
        return Ok(PlannedSignal {
            broker: Broker::SynchronisingOutput { signal_name: signal.name.clone(), data_source: Arc::clone(data_source), copies },
            trigger_consumer: None,
        });
    }

    if signal.samples_per_cycle > 1 {
        let buffers = data_source.number_of_memory_buffers();
        if buffers < signal.samples_per_cycle {
            return Err(PlanError::SamplesExceedBufferCount {
                signal: signal.name.clone(),
                samples: signal.samples_per_cycle,
                data_source: signal.data_source.clone(),
                buffers,
            });
        }
        let entries = (0..signal.samples_per_cycle)
            .map(|offset| {
                MultiBufferEntry::new(
                    Arc::clone(&function_owner),
                    signal_index,
                    Arc::clone(&ds_owner),
                    ds_signal_index,
                    buffers,
                    offset,
                    element_size,
                    signal.direction,
                )
            })
            .collect();
        return Ok(PlannedSignal {
            broker: Broker::MultiBuffer { signal_name: signal.name.clone(), entries },
            trigger_consumer: None,
        });
    }

    let copies = match &signal.range_mask {
        Some(mask) => {
            let mut dest_offset = 0usize;
            mask.intervals()
                .iter()
                .map(|range| {
                    let lo_bytes = range.lo as usize * element_size;
                    let len_bytes = range.len() as usize * element_size;
                    let descriptor = match signal.direction {
                        Direction::Input => CopyDescriptor::new(
                            Arc::clone(&ds_owner),
                            ds_signal_index,
                            lo_bytes,
                            Arc::clone(&function_owner),
                            signal_index,
                            dest_offset,
                            len_bytes,
                        ),
                        Direction::Output => CopyDescriptor::new(
                            Arc::clone(&function_owner),
                            signal_index,
                            dest_offset,
                            Arc::clone(&ds_owner),
                            ds_signal_index,
                            lo_bytes,
                            len_bytes,
                        ),
                    };
                    dest_offset += len_bytes;
                    descriptor
                })
                .collect()
        }
        None => vec![match signal.direction {
            Direction::Input => CopyDescriptor::new(ds_owner, ds_signal_index, 0, function_owner, signal_index, 0, byte_count),
            Direction::Output => {
                CopyDescriptor::new(function_owner, signal_index, 0, ds_owner, ds_signal_index, 0, byte_count)
            }
        }],
    };
    Ok(PlannedSignal { broker: Broker::DirectCopy { signal_name: signal.name.clone(), copies }, trigger_consumer: None })
}
