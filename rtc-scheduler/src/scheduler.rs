//! The top-level scheduler: owns the running real-time threads and drives
//! the live reconfiguration protocol (spec §4.5).

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rtc_concurrency::{CountingRendezvous, SingleThreadService};
use rtc_model::{DataSource, Function};
use tracing::info;

use crate::descriptor::StateDescriptor;
use crate::error::{Result, TransitionError};
use crate::plan::prepare_state;
use crate::runtime::RealTimeThread;

/// Owns the function/data-source registry, the declared states, and every
/// currently running real-time thread and background trigger consumer.
pub struct Scheduler {
    states: HashMap<String, StateDescriptor>,
    functions: HashMap<String, Arc<dyn Function>>,
    data_sources: HashMap<String, Arc<dyn DataSource>>,
    threads: Mutex<HashMap<String, RealTimeThread>>,
    trigger_consumers: Mutex<Vec<SingleThreadService>>,
    current_state: Mutex<Option<String>>,
    transitioning: AtomicBool,
}

impl Scheduler {
    pub fn new(
        states: HashMap<String, StateDescriptor>,
        functions: HashMap<String, Arc<dyn Function>>,
        data_sources: HashMap<String, Arc<dyn DataSource>>,
    ) -> Self {
        Self {
            states,
            functions,
            data_sources,
            threads: Mutex::new(HashMap::new()),
            trigger_consumers: Mutex::new(Vec::new()),
            current_state: Mutex::new(None),
            transitioning: AtomicBool::new(false),
        }
    }

    pub fn current_state(&self) -> Option<String> {
        self.current_state.lock().expect("current-state mutex poisoned").clone()
    }

    /// Cycle counter of `thread_name`, if it is running.
    pub fn cycle_count(&self, thread_name: &str) -> Option<u64> {
        self.threads.lock().expect("threads mutex poisoned").get(thread_name).map(|t| t.cycle_count())
    }

    /// First start from nothing: plan `state_name` and spawn its threads.
    pub fn start(&self, state_name: &str, stop_timeout: Duration) -> Result<()> {
        if self.current_state().is_some() {
            return self.transition_to(state_name, stop_timeout);
        }
        let state = self.states.get(state_name).ok_or_else(|| TransitionError::UnknownState(state_name.to_string()))?;
        let planned = prepare_state(state, &self.functions, &self.data_sources, None)?;

        let mut threads = self.threads.lock().expect("threads mutex poisoned");
        for (thread_name, thread_plan) in planned.threads {
            threads.insert(thread_name.clone(), RealTimeThread::spawn(thread_name, thread_plan, stop_timeout));
        }
        self.trigger_consumers.lock().expect("trigger-consumers mutex poisoned").extend(planned.trigger_consumers);
        *self.current_state.lock().expect("current-state mutex poisoned") = Some(state_name.to_string());
        info!(state = state_name, "scheduler started");
        Ok(())
    }

    /// Live reconfiguration: transition the already-running scheduler to
    /// `state_name`, bounded by `timeout` (spec §4.5's live reconfiguration
    /// protocol).
    pub fn transition_to(&self, state_name: &str, timeout: Duration) -> Result<()> {
        if self.transitioning.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            return Err(TransitionError::AlreadyTransitioning);
        }
        let result = self.transition_to_inner(state_name, timeout);
        self.transitioning.store(false, Ordering::SeqCst);
        result
    }

    fn transition_to_inner(&self, state_name: &str, timeout: Duration) -> Result<()> {
        let state = self.states.get(state_name).ok_or_else(|| TransitionError::UnknownState(state_name.to_string()))?;
        let previous_state = self.current_state();
        let previous_state = previous_state.as_deref().and_then(|name| self.states.get(name));
        let planned = prepare_state(state, &self.functions, &self.data_sources, previous_state)?;

        let threads = self.threads.lock().expect("threads mutex poisoned");
        let mut overlapping = Vec::new();
        let mut arriving = Vec::new();
        for (thread_name, thread_plan) in planned.threads {
            if threads.contains_key(&thread_name) {
                overlapping.push((thread_name, thread_plan));
            } else {
                arriving.push((thread_name, thread_plan));
            }
        }

        let rendezvous = Arc::new(CountingRendezvous::new(overlapping.len().max(1) as u32));
        let mut staged_names = Vec::with_capacity(overlapping.len());
        for (thread_name, thread_plan) in overlapping {
            let thread = threads.get(&thread_name).expect("checked contains_key above");
            staged_names.push(thread_name);
            thread.stage_commit(Arc::new(thread_plan), Arc::clone(&rendezvous), timeout);
        }
        drop(threads);

        if !staged_names.is_empty() {
            std::thread::sleep(timeout + Duration::from_millis(10));
        }

        let mut threads = self.threads.lock().expect("threads mutex poisoned");
        let all_committed = staged_names.iter().all(|name| threads.get(name).map(|t| t.committed()).unwrap_or(false));

        if !all_committed {
            drop(threads);
            rendezvous.force_reset();
            return Err(TransitionError::CommitTimeout { state: state_name.to_string() });
        }

        // Threads with no counterpart in the running set join fresh; they
        // have no prior cycle count to preserve and need no rendezvous.
        let arriving_names: HashSet<String> = arriving.iter().map(|(name, _)| name.clone()).collect();
        for (thread_name, thread_plan) in arriving {
            threads.insert(thread_name.clone(), RealTimeThread::spawn(thread_name, thread_plan, timeout));
        }

        // Threads with no counterpart in the target state are no longer
        // wanted; stop and drop them now that the commit above succeeded.
        let wanted: HashSet<&str> =
            staged_names.iter().map(String::as_str).chain(arriving_names.iter().map(String::as_str)).collect();
        let departing: Vec<String> = threads.keys().filter(|name| !wanted.contains(name.as_str())).cloned().collect();
        for name in departing {
            if let Some(thread) = threads.remove(&name) {
                thread.stop();
            }
        }
        drop(threads);

        self.trigger_consumers.lock().expect("trigger-consumers mutex poisoned").extend(planned.trigger_consumers);
        *self.current_state.lock().expect("current-state mutex poisoned") = Some(state_name.to_string());
        info!(state = state_name, "scheduler transitioned");
        Ok(())
    }

    /// Cooperative stop of every real-time thread, then every background
    /// trigger consumer (spec §4.7's stop ordering).
    pub fn stop(&self) {
        let mut threads = self.threads.lock().expect("threads mutex poisoned");
        for (_, thread) in threads.drain() {
            thread.stop();
        }
        let mut consumers = self.trigger_consumers.lock().expect("trigger-consumers mutex poisoned");
        for consumer in consumers.drain(..) {
            consumer.stop();
        }
        *self.current_state.lock().expect("current-state mutex poisoned") = None;
    }
}
