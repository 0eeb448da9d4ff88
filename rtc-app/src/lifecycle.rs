//! The application root: the single owner of every function, data source,
//! state descriptor and the state machine, driving the
//! `Unconfigured -> Configured -> Prepared -> Running -> Stopped`
//! lifecycle.
//!
//! Grounded on `knhk-autonomic`'s top-level `AutonomicSystem`, which owns
//! its monitor/analyze/plan/execute collaborators the same way: built once
//! from already-constructed parts, then driven through named phases.
//! Instantiating a `Function`/`DataSource` implementation from a class
//! name read out of the configuration tree is an object-registry/
//! reflection concern and stays out of scope here (see DESIGN.md); the
//! caller supplies already-built registries and `configure` only builds
//! what the tree genuinely governs: state descriptors and the state
//! machine.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rtc_concurrency::SingleThreadService;
use rtc_model::{ConfigNode, DataSource, Function};
use rtc_scheduler::{prepare_state, Scheduler, StateDescriptor, TransitionError};
use rtc_scheduler::{spawn_dispatcher, MessageBus, StateMachine, StateMachineSpec};
use tracing::{info, instrument};

use crate::error::{ApplicationError, ConfigurationError, Result};

/// Where the application is in its lifecycle. `prepare`/`start`/`send` are
/// each only meaningful from particular stages; calling them out of order
/// is a programming error surfaced as `ApplicationError::WrongLifecycleStage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Configured,
    Prepared,
    Running,
    Stopped,
}

/// `prepare_state` only ever fails with `UnknownFunction` or
/// `PrepareFailed`; both map onto `ConfigurationError` directly.
fn plan_error_to_configuration(err: TransitionError) -> ConfigurationError {
    match err {
        TransitionError::UnknownFunction { function, .. } => ConfigurationError::UnknownFunction(function),
        TransitionError::PrepareFailed { source, .. } => ConfigurationError::Plan(source),
        other => unreachable!("prepare_state does not produce {other:?}"),
    }
}

impl Lifecycle {
    fn as_str(self) -> &'static str {
        match self {
            Lifecycle::Configured => "Configured",
            Lifecycle::Prepared => "Prepared",
            Lifecycle::Running => "Running",
            Lifecycle::Stopped => "Stopped",
        }
    }
}

/// Everything needed to build an `Application`: the registries a real
/// deployment's object-registry layer would have already instantiated,
/// plus the declared states and an optional message-driven state machine.
pub struct ApplicationParts {
    pub functions: HashMap<String, Arc<dyn Function>>,
    pub data_sources: HashMap<String, Arc<dyn DataSource>>,
    pub states: HashMap<String, StateDescriptor>,
    pub initial_state: String,
    pub state_machine: Option<(StateMachineSpec, Arc<dyn MessageBus>)>,
}

/// The application root (spec's application-lifecycle module). Owns the
/// scheduler, the configuration tree it was built from (kept for
/// introspection), and, once configured with one, the running state
/// machine and its dispatcher thread.
pub struct Application {
    tree: ConfigNode,
    scheduler: Scheduler,
    initial_state: String,
    state_machine: Option<Arc<StateMachine>>,
    dispatcher: Mutex<Option<SingleThreadService>>,
    stage: Mutex<Lifecycle>,
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("initial_state", &self.initial_state)
            .finish_non_exhaustive()
    }
}

impl Application {
    /// Build an `Application` from a configuration tree and its already
    /// resolved parts. Runs the broker planner for every declared state up
    /// front, so a planner rule violation (spec §7's *ConfigurationError*:
    /// "malformed tree, missing field, type/range mismatch, planner rule
    /// violated") is surfaced synchronously from `configure` and the
    /// application never reaches `Running` with a state that cannot plan.
    #[instrument(skip_all)]
    pub fn configure(tree: ConfigNode, parts: ApplicationParts) -> std::result::Result<Self, ConfigurationError> {
        if parts.states.is_empty() {
            return Err(ConfigurationError::MissingNode("States".to_string()));
        }
        for state in parts.states.values() {
            if state.threads.is_empty() {
                return Err(ConfigurationError::EmptyState(state.name.clone()));
            }
        }
        for function in parts.functions.values() {
            for signal in function.signals() {
                if !parts.data_sources.contains_key(&signal.data_source) {
                    return Err(ConfigurationError::UnknownDataSource(signal.data_source.clone()));
                }
            }
        }
        for state in parts.states.values() {
            prepare_state(state, &parts.functions, &parts.data_sources, None).map_err(plan_error_to_configuration)?;
        }

        let scheduler = Scheduler::new(parts.states, parts.functions, parts.data_sources);
        let state_machine = parts.state_machine.map(|(spec, bus)| StateMachine::new(spec, bus));

        info!("application configured");
        Ok(Self {
            tree,
            scheduler,
            initial_state: parts.initial_state,
            state_machine,
            dispatcher: Mutex::new(None),
            stage: Mutex::new(Lifecycle::Configured),
        })
    }

    /// The configuration tree this application was built from.
    pub fn tree(&self) -> &ConfigNode {
        &self.tree
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self.stage.lock().expect("lifecycle mutex poisoned")
    }

    fn require_stage(&self, expected: &[Lifecycle]) -> Result<()> {
        let current = self.lifecycle();
        if expected.contains(&current) {
            Ok(())
        } else {
            Err(ApplicationError::WrongLifecycleStage { current: current.as_str() })
        }
    }

    /// Plan the initial state's brokers without starting any thread, so a
    /// caller can surface planning errors before committing to running.
    pub fn prepare(&self, stop_timeout: Duration) -> Result<()> {
        self.require_stage(&[Lifecycle::Configured])?;
        self.scheduler.start(&self.initial_state, stop_timeout)?;
        self.scheduler.stop();
        *self.stage.lock().expect("lifecycle mutex poisoned") = Lifecycle::Prepared;
        Ok(())
    }

    /// Start running: spawn every real-time thread of the initial state,
    /// plus the state machine's dispatcher thread if one was configured.
    pub fn start(&self, stop_timeout: Duration) -> Result<()> {
        self.require_stage(&[Lifecycle::Configured, Lifecycle::Prepared])?;
        self.scheduler.start(&self.initial_state, stop_timeout)?;
        if let Some(machine) = &self.state_machine {
            let dispatcher = spawn_dispatcher(Arc::clone(machine), Duration::from_millis(100), stop_timeout);
            dispatcher.start();
            *self.dispatcher.lock().expect("dispatcher mutex poisoned") = Some(dispatcher);
        }
        *self.stage.lock().expect("lifecycle mutex poisoned") = Lifecycle::Running;
        info!(state = %self.initial_state, "application running");
        Ok(())
    }

    /// Live-transition the running scheduler to `state_name`.
    pub fn transition_to(&self, state_name: &str, timeout: Duration) -> Result<()> {
        self.require_stage(&[Lifecycle::Running])?;
        self.scheduler.transition_to(state_name, timeout)?;
        Ok(())
    }

    /// Fire a state-machine event. Requires a state machine to have been
    /// configured.
    pub fn send(&self, event_name: impl Into<String>) -> Result<()> {
        self.require_stage(&[Lifecycle::Running])?;
        match &self.state_machine {
            Some(machine) => {
                machine.fire(event_name);
                Ok(())
            }
            None => Err(ApplicationError::WrongLifecycleStage { current: "Running (no state machine configured)" }),
        }
    }

    /// Cooperative stop of every real-time thread, then the state
    /// machine's dispatcher, in that order (spec §4.7's stop ordering).
    pub fn stop(&self) -> Result<()> {
        self.scheduler.stop();
        if let Some(machine) = &self.state_machine {
            machine.shutdown();
        }
        if let Some(dispatcher) = self.dispatcher.lock().expect("dispatcher mutex poisoned").take() {
            dispatcher.stop();
        }
        *self.stage.lock().expect("lifecycle mutex poisoned") = Lifecycle::Stopped;
        info!("application stopped");
        Ok(())
    }
}
