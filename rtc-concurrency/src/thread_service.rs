//! Embedded thread services: lifecycle-managed worker threads that execute
//! a user-supplied callable through a stage-tagged state machine.
//!
//! Grounded on `Source/Core/Scheduler/L3Services/SingleThreadService.h` and
//! `MultiClientService.{h,cpp}`: a single OS thread re-enters the callable
//! with an `ExecutionInfo` stage tag (`StartUp`, `Main`, `Termination`,
//! `BadTermination`); `Stop()` first requests a cooperative stop bounded by
//! a timeout, and a second `Stop()` while still running promotes to a
//! kill request the implementation may refuse (documented below).

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{info, warn};

/// The call stage passed to the hosted callable on each re-entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStage {
    /// First call after `Start()`, before entering the `Main` loop.
    StartUp,
    /// Steady-state call, repeated until a stop is requested or a fatal
    /// result is returned.
    Main,
    /// Final call on a cooperative stop, before the thread exits.
    Termination,
    /// Final call when `StartUp` or `Main` returned a fatal result.
    BadTermination,
}

/// The result of one callable invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableSignal {
    /// Continue normally.
    Ok,
    /// Unrecoverable error; the service transitions to `BadTermination`.
    Fatal,
    /// `Main` stage only: the hosted server is under load (multi-client
    /// admission-control surface).
    Busy,
    /// `Main` stage only: the hosted server is idle and the pool may be
    /// oversized.
    Idle,
}

/// A callable hosted by an embedded thread service.
pub type ThreadCallable = Arc<dyn Fn(ExecutionStage) -> CallableSignal + Send + Sync>;

/// Observable lifecycle states, including the timeout variants that let
/// supervisors escalate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    /// Not running.
    Off,
    /// `StartUp` is in progress.
    Starting,
    /// `Main` is looping.
    Running,
    /// A cooperative stop was requested and `Termination` is pending.
    Stopping,
    /// `StartUp` did not complete within the start timeout.
    TimeoutStarting,
    /// `Stop()` did not complete within the stop timeout.
    TimeoutStopping,
    /// A second `Stop()` was issued while still stopping and the kill was
    /// refused (documented policy: this implementation never forcibly
    /// terminates the OS thread, it only escalates the observable status).
    TimeoutKilling,
    /// `StartUp` or `Main` returned `Fatal`.
    BadTerminationState,
}

/// A single hosted worker thread.
pub struct SingleThreadService {
    callable: ThreadCallable,
    status: Arc<Mutex<ServiceStatus>>,
    stop_requested: Arc<AtomicBool>,
    stop_calls: AtomicU8,
    done_tx: Mutex<Option<Sender<()>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    stop_timeout: Duration,
}

impl SingleThreadService {
    /// Construct a service hosting `callable`, with `stop_timeout` bounding
    /// the cooperative stop wait.
    pub fn new(callable: ThreadCallable, stop_timeout: Duration) -> Self {
        Self {
            callable,
            status: Arc::new(Mutex::new(ServiceStatus::Off)),
            stop_requested: Arc::new(AtomicBool::new(false)),
            stop_calls: AtomicU8::new(0),
            done_tx: Mutex::new(None),
            handle: Mutex::new(None),
            stop_timeout,
        }
    }

    /// Current observable status. Safe to call from any thread.
    pub fn status(&self) -> ServiceStatus {
        *self.status.lock().expect("status mutex poisoned")
    }

    /// Spawn the worker thread and run it through `StartUp`.
    pub fn start(&self) -> ServiceStatus {
        if self.status() != ServiceStatus::Off {
            return self.status();
        }
        self.stop_requested.store(false, Ordering::SeqCst);
        self.stop_calls.store(0, Ordering::SeqCst);
        *self.status.lock().expect("status mutex poisoned") = ServiceStatus::Starting;

        let (tx, rx) = mpsc::channel();
        *self.done_tx.lock().expect("done_tx mutex poisoned") = Some(tx.clone());

        let callable = self.callable.clone();
        let status = self.status.clone();
        let stop_requested = self.stop_requested.clone();

        let handle = thread::spawn(move || {
            let startup = callable(ExecutionStage::StartUp);
            if startup == CallableSignal::Fatal {
                *status.lock().expect("status mutex poisoned") = ServiceStatus::BadTerminationState;
                let _ = callable(ExecutionStage::BadTermination);
                let _ = tx.send(());
                return;
            }
            *status.lock().expect("status mutex poisoned") = ServiceStatus::Running;
            loop {
                if stop_requested.load(Ordering::SeqCst) {
                    break;
                }
                match callable(ExecutionStage::Main) {
                    CallableSignal::Fatal => {
                        *status.lock().expect("status mutex poisoned") =
                            ServiceStatus::BadTerminationState;
                        let _ = callable(ExecutionStage::BadTermination);
                        let _ = tx.send(());
                        return;
                    }
                    _ => continue,
                }
            }
            *status.lock().expect("status mutex poisoned") = ServiceStatus::Stopping;
            let _ = callable(ExecutionStage::Termination);
            *status.lock().expect("status mutex poisoned") = ServiceStatus::Off;
            let _ = tx.send(());
        });

        *self.handle.lock().expect("handle mutex poisoned") = Some(handle);
        self.await_startup(rx)
    }

    fn await_startup(&self, _rx: mpsc::Receiver<()>) -> ServiceStatus {
        let deadline = Instant::now() + self.stop_timeout;
        while Instant::now() < deadline {
            let status = self.status();
            if status != ServiceStatus::Starting {
                return status;
            }
            thread::sleep(Duration::from_millis(1));
        }
        if self.status() == ServiceStatus::Starting {
            *self.status.lock().expect("status mutex poisoned") = ServiceStatus::TimeoutStarting;
        }
        self.status()
    }

    /// Request a stop. A cooperative stop is attempted first, bounded by
    /// `stop_timeout`. A second call while still running promotes to a
    /// kill request; this implementation refuses to kill and only reports
    /// `TimeoutKilling`.
    pub fn stop(&self) -> ServiceStatus {
        let call_index = self.stop_calls.fetch_add(1, Ordering::SeqCst);
        if self.status() == ServiceStatus::Off {
            return ServiceStatus::Off;
        }
        self.stop_requested.store(true, Ordering::SeqCst);

        let deadline = Instant::now() + self.stop_timeout;
        while Instant::now() < deadline {
            if self.status() == ServiceStatus::Off {
                if let Some(handle) = self.handle.lock().expect("handle mutex poisoned").take() {
                    let _ = handle.join();
                }
                return ServiceStatus::Off;
            }
            thread::sleep(Duration::from_millis(1));
        }

        if call_index == 0 {
            *self.status.lock().expect("status mutex poisoned") = ServiceStatus::TimeoutStopping;
            ServiceStatus::TimeoutStopping
        } else {
            warn!("kill requested but refused; thread remains joinable");
            *self.status.lock().expect("status mutex poisoned") = ServiceStatus::TimeoutKilling;
            ServiceStatus::TimeoutKilling
        }
    }
}

impl Drop for SingleThreadService {
    fn drop(&mut self) {
        if self.status() != ServiceStatus::Off {
            self.stop();
        }
    }
}

/// A pool of `SingleThreadService` workers, sized between `min` and `max`,
/// grown on `Busy` and shrunk to `min` on `Idle`.
pub struct MultiClientService {
    callable: ThreadCallable,
    min: u32,
    max: u32,
    stop_timeout: Duration,
    workers: Mutex<Vec<Arc<SingleThreadService>>>,
}

impl MultiClientService {
    /// Construct a pool hosting `callable`, sized in `[min, max]`.
    pub fn new(callable: ThreadCallable, min: u32, max: u32, stop_timeout: Duration) -> Self {
        assert!(min >= 1 && min <= max, "MinNumberOfThreads must be >= 1 and <= Max");
        Self { callable, min, max, stop_timeout, workers: Mutex::new(Vec::new()) }
    }

    /// Start `min` workers.
    pub fn start(&self) {
        let mut workers = self.workers.lock().expect("workers mutex poisoned");
        for _ in 0..self.min {
            workers.push(self.spawn_worker());
        }
        info!(count = workers.len(), "multi-client pool started");
    }

    fn spawn_worker(&self) -> Arc<SingleThreadService> {
        let inner_callable = self.callable.clone();
        let pool_callable: ThreadCallable = Arc::new(move |stage| inner_callable(stage));
        let service = Arc::new(SingleThreadService::new(pool_callable, self.stop_timeout));
        service.start();
        service
    }

    /// Grow the pool by one worker, up to `max`.
    pub fn grow(&self) {
        let mut workers = self.workers.lock().expect("workers mutex poisoned");
        if (workers.len() as u32) < self.max {
            workers.push(self.spawn_worker());
        }
    }

    /// Shrink the pool down to `min` workers.
    pub fn shrink(&self) {
        let mut workers = self.workers.lock().expect("workers mutex poisoned");
        while (workers.len() as u32) > self.min {
            if let Some(worker) = workers.pop() {
                worker.stop();
            }
        }
    }

    /// Feed a signal observed from a hosted callable's `Main` invocation
    /// into the pool's admission-control policy.
    pub fn observe(&self, signal: CallableSignal) {
        match signal {
            CallableSignal::Busy => self.grow(),
            CallableSignal::Idle => self.shrink(),
            _ => {}
        }
    }

    /// Current pool size.
    pub fn pool_size(&self) -> usize {
        self.workers.lock().expect("workers mutex poisoned").len()
    }

    /// Stop every worker in the pool.
    pub fn stop(&self) {
        let mut workers = self.workers.lock().expect("workers mutex poisoned");
        for worker in workers.drain(..) {
            worker.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn single_service_runs_startup_then_main_until_stopped() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let callable: ThreadCallable = Arc::new(move |stage| {
            if stage == ExecutionStage::Main {
                calls2.fetch_add(1, Ordering::SeqCst);
            }
            CallableSignal::Ok
        });
        let service = SingleThreadService::new(callable, Duration::from_secs(2));
        assert_eq!(service.start(), ServiceStatus::Running);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(service.stop(), ServiceStatus::Off);
        assert!(calls.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn fatal_startup_goes_to_bad_termination() {
        let callable: ThreadCallable = Arc::new(|stage| {
            if stage == ExecutionStage::StartUp {
                CallableSignal::Fatal
            } else {
                CallableSignal::Ok
            }
        });
        let service = SingleThreadService::new(callable, Duration::from_secs(1));
        let status = service.start();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(status, ServiceStatus::BadTerminationState);
    }

    #[test]
    fn second_stop_reports_timeout_killing_when_callable_never_yields() {
        let callable: ThreadCallable = Arc::new(|stage| {
            if stage == ExecutionStage::Main {
                thread::sleep(Duration::from_secs(10));
            }
            CallableSignal::Ok
        });
        let service = Arc::new(SingleThreadService::new(callable, Duration::from_millis(30)));
        service.start();
        thread::sleep(Duration::from_millis(10));
        assert_eq!(service.stop(), ServiceStatus::TimeoutStopping);
        assert_eq!(service.stop(), ServiceStatus::TimeoutKilling);
    }

    #[test]
    fn multi_client_pool_grows_on_busy_and_shrinks_to_min_on_idle() {
        let callable: ThreadCallable = Arc::new(|_stage| CallableSignal::Ok);
        let pool = MultiClientService::new(callable, 1, 4, Duration::from_secs(1));
        pool.start();
        assert_eq!(pool.pool_size(), 1);
        pool.observe(CallableSignal::Busy);
        pool.observe(CallableSignal::Busy);
        assert_eq!(pool.pool_size(), 3);
        pool.observe(CallableSignal::Idle);
        assert_eq!(pool.pool_size(), 1);
        pool.stop();
        assert_eq!(pool.pool_size(), 0);
    }

    #[test]
    fn multi_client_pool_never_exceeds_max() {
        let callable: ThreadCallable = Arc::new(|_stage| CallableSignal::Ok);
        let pool = MultiClientService::new(callable, 1, 2, Duration::from_secs(1));
        pool.start();
        for _ in 0..5 {
            pool.observe(CallableSignal::Busy);
        }
        assert_eq!(pool.pool_size(), 2);
        pool.stop();
    }
}
