//! Binds a state descriptor's threads to concrete broker plans (spec
//! §4.5's "pre-resolve, per state S, per thread T" step and the live
//! reconfiguration protocol's step 1, `prepare_state`).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rtc_broker::{plan as plan_brokers, Broker, PlannerInput};
use rtc_model::{DataSource, Endianness, Function};
use rtc_concurrency::SingleThreadService;

use crate::descriptor::StateDescriptor;
use crate::error::{Result, TransitionError};

/// One function bound into a thread's pipeline, with its input/output
/// broker lists already resolved.
pub struct BoundFunction {
    pub function: Arc<dyn Function>,
    pub input_brokers: Vec<Broker>,
    pub output_brokers: Vec<Broker>,
}

/// A fully resolved pipeline for one thread of one state.
pub struct ThreadPlan {
    pub thread_name: String,
    pub functions: Vec<BoundFunction>,
}

/// The result of preparing one state: a plan per thread plus the
/// background trigger consumers spawned for this state's triggered
/// outputs (owned by the scheduler, stopped on the next prepare or on
/// shutdown).
pub struct StatePlan {
    pub state_name: String,
    pub threads: HashMap<String, ThreadPlan>,
    pub trigger_consumers: Vec<SingleThreadService>,
}

/// Resolve every thread of `state` into a `ThreadPlan`, per the planner
/// described in spec §4.3, run once across the whole state so the
/// one-synchronising-signal-per-thread and
/// one-function-per-triggered-data-source rules see every function.
///
/// `previous` is the state currently running, if any; its functions are
/// already live and keep whatever values their data sources hold, so
/// only functions newly entering `state` have their signals' default
/// values (re)applied (spec's live reconfiguration protocol step 1).
pub fn prepare_state(
    state: &StateDescriptor,
    functions: &HashMap<String, Arc<dyn Function>>,
    data_sources: &HashMap<String, Arc<dyn DataSource>>,
    previous: Option<&StateDescriptor>,
) -> Result<StatePlan> {
    let mut thread_of = HashMap::new();
    let mut resolved = Vec::new();
    for thread in &state.threads {
        for function_name in &thread.function_names {
            let function = functions.get(function_name).ok_or_else(|| TransitionError::UnknownFunction {
                state: state.name.clone(),
                thread: thread.name.clone(),
                function: function_name.clone(),
            })?;
            thread_of.insert(function_name.clone(), thread.name.clone());
            resolved.push(Arc::clone(function));
        }
    }

    let planned = plan_brokers(PlannerInput { functions: &resolved, thread_of: &thread_of, data_sources })
        .map_err(|source| TransitionError::PrepareFailed { state: state.name.clone(), source })?;

    let previously_active: HashSet<&str> = previous
        .map(|p| p.threads.iter().flat_map(|t| t.function_names.iter().map(String::as_str)).collect())
        .unwrap_or_default();
    apply_default_values(&resolved, &previously_active, data_sources);

    let mut by_function: HashMap<String, rtc_broker::FunctionBrokers> =
        planned.into_iter().map(|fb| (fb.function_name.clone(), fb)).collect();

    let mut threads = HashMap::new();
    let mut trigger_consumers = Vec::new();
    for thread in &state.threads {
        let mut bound = Vec::with_capacity(thread.function_names.len());
        for function_name in &thread.function_names {
            let function = Arc::clone(&functions[function_name]);
            let mut fb = by_function.remove(function_name).expect("every function was planned");
            trigger_consumers.append(&mut fb.trigger_consumers);
            bound.push(BoundFunction { function, input_brokers: fb.input_brokers, output_brokers: fb.output_brokers });
        }
        threads.insert(thread.name.clone(), ThreadPlan { thread_name: thread.name.clone(), functions: bound });
    }

    Ok(StatePlan { state_name: state.name.clone(), threads, trigger_consumers })
}

/// Write each newly-active function's signal default values into its data
/// source, buffer 0..number_of_memory_buffers, before the state's threads
/// start reading them. Signal/data-source resolution already succeeded in
/// `plan_brokers` above, so lookups here are infallible.
fn apply_default_values(
    resolved: &[Arc<dyn Function>],
    previously_active: &HashSet<&str>,
    data_sources: &HashMap<String, Arc<dyn DataSource>>,
) {
    for function in resolved {
        if previously_active.contains(function.name()) {
            continue;
        }
        for signal in function.signals() {
            let Some(default) = &signal.default_value else { continue };
            let data_source = &data_sources[&signal.data_source];
            let ds_signal_index =
                data_source.signal_index(signal.data_source_name()).expect("planner already validated signal");
            let bytes = default.to_bytes(Endianness::Little);
            for buffer_index in 0..data_source.number_of_memory_buffers() {
                if let Some(addr) = data_source.signal_memory(ds_signal_index, buffer_index) {
                    data_source.write_bytes(addr, 0, &bytes);
                }
            }
        }
    }
}
