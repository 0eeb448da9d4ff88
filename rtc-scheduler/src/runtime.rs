//! The real-time thread driver (spec §4.5's execution driver) hosted on an
//! embedded thread service, reading its broker/function pipeline through a
//! `DoubleBuffer` so a state transition never exposes a half-updated plan
//! (I-S1), and committing a staged transition only once every thread in
//! the state has reached its own cycle boundary and arrived at a shared
//! `CountingRendezvous` (spec §4.5 step 3).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rtc_concurrency::{
    CallableSignal, CountingRendezvous, ExecutionStage, ServiceStatus, SingleThreadService, ThreadCallable,
};
use tracing::{instrument, warn};

use crate::config::DoubleBuffer;
use crate::plan::ThreadPlan;

struct PendingCommit {
    rendezvous: Arc<CountingRendezvous>,
    timeout: Duration,
}

/// One running real-time thread (spec §4.5's "one real-time thread per T").
/// Outlives state transitions: `stage_commit`/the rendezvous swap its
/// pipeline without stopping the underlying OS thread, so cycle counters
/// never reset (I-S3).
pub struct RealTimeThread {
    pub name: String,
    plan: Arc<DoubleBuffer<ThreadPlan>>,
    cycle_counter: Arc<AtomicU64>,
    pending: Arc<Mutex<Option<PendingCommit>>>,
    committed: Arc<AtomicBool>,
    service: SingleThreadService,
}

impl RealTimeThread {
    /// Spawn the OS thread hosting `initial_plan`'s pipeline.
    pub fn spawn(name: impl Into<String>, initial_plan: ThreadPlan, stop_timeout: Duration) -> Self {
        let name = name.into();
        let plan = Arc::new(DoubleBuffer::new(Arc::new(initial_plan)));
        let cycle_counter = Arc::new(AtomicU64::new(0));
        let pending: Arc<Mutex<Option<PendingCommit>>> = Arc::new(Mutex::new(None));
        let committed = Arc::new(AtomicBool::new(false));

        let plan_for_thread = Arc::clone(&plan);
        let counter_for_thread = Arc::clone(&cycle_counter);
        let pending_for_thread = Arc::clone(&pending);
        let committed_for_thread = Arc::clone(&committed);
        let thread_name = name.clone();

        let callable: ThreadCallable = Arc::new(move |stage| match stage {
            ExecutionStage::StartUp => CallableSignal::Ok,
            ExecutionStage::Main => {
                run_one_cycle(&thread_name, &plan_for_thread, &counter_for_thread);
                try_commit_pending(&plan_for_thread, &pending_for_thread, &committed_for_thread);
                CallableSignal::Ok
            }
            ExecutionStage::Termination | ExecutionStage::BadTermination => CallableSignal::Ok,
        });

        let service = SingleThreadService::new(callable, stop_timeout);
        service.start();
        Self { name, plan, cycle_counter, pending, committed, service }
    }

    /// Cycles completed so far. Monotonic across state transitions (I-S3).
    pub fn cycle_count(&self) -> u64 {
        self.cycle_counter.load(Ordering::Relaxed)
    }

    /// Stage `new_plan` and arrange for this thread to attempt to commit
    /// it at the end of its next cycle, gated by `rendezvous`. Call this
    /// on every thread of the target state before any of them can commit.
    pub fn stage_commit(&self, new_plan: Arc<ThreadPlan>, rendezvous: Arc<CountingRendezvous>, timeout: Duration) {
        self.plan.stage(new_plan);
        self.committed.store(false, Ordering::SeqCst);
        *self.pending.lock().expect("pending-commit mutex poisoned") = Some(PendingCommit { rendezvous, timeout });
    }

    /// True once this thread has flipped to the staged plan.
    pub fn committed(&self) -> bool {
        self.committed.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> ServiceStatus {
        self.service.status()
    }

    pub fn stop(&self) -> ServiceStatus {
        self.service.stop()
    }
}

#[instrument(skip(plan, counter), fields(thread = %name))]
fn run_one_cycle(name: &str, plan: &DoubleBuffer<ThreadPlan>, counter: &AtomicU64) {
    let current = plan.current();
    let cycle = counter.load(Ordering::Relaxed);
    for bound in &current.functions {
        let mut faulted = false;
        for broker in &bound.input_brokers {
            if let Err(err) = broker.execute(cycle) {
                warn!(function = bound.function.name(), %err, "input broker failed");
                faulted = true;
                break;
            }
        }
        if faulted {
            continue;
        }
        if let Err(err) = bound.function.execute() {
            warn!(function = bound.function.name(), %err, "function execute failed");
            continue;
        }
        for broker in &bound.output_brokers {
            if let Err(err) = broker.execute(cycle) {
                warn!(function = bound.function.name(), %err, "output broker failed");
                break;
            }
        }
    }
    counter.fetch_add(1, Ordering::Relaxed);
}

/// If a commit is staged, arrive at its rendezvous; on success (every
/// thread in the state arrived within the timeout) flip to the staged
/// plan. On timeout or cancellation, leave the current plan untouched —
/// nobody in the state commits unless everybody does (P6).
fn try_commit_pending(plan: &DoubleBuffer<ThreadPlan>, pending: &Mutex<Option<PendingCommit>>, committed: &AtomicBool) {
    let Some(commit) = pending.lock().expect("pending-commit mutex poisoned").take() else {
        return;
    };
    match commit.rendezvous.wait_for_all(commit.timeout) {
        Ok(_) => {
            plan.commit();
            committed.store(true, Ordering::SeqCst);
        }
        Err(err) => {
            warn!(%err, "state commit rendezvous did not succeed; keeping previous configuration");
        }
    }
}
