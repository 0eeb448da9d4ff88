//! The trigger broker: a background-drained, pre/post-trigger capture
//! ring. Grounded on `original_source/.../MemoryMapTriggerOutputBroker.cpp`
//! and spec §4.4.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rtc_concurrency::{CallableSignal, Event, ExecutionStage, SingleThreadService};
use rtc_model::{DataSource, MemoryOwner};
use tracing::{instrument, warn};

use crate::error::{CycleError, CycleResult};

struct Slot {
    bytes: Mutex<Vec<u8>>,
    triggered: Mutex<bool>,
}

/// Indices and counters shared between producer and consumer, mutated
/// under one short-held lock alongside the event post — the "fast lock
/// then post" composition spec §4.1 asks the counting rendezvous and the
/// trigger ring to share.
struct RingState {
    write_idx: usize,
    read_synch_idx: usize,
    post_trigger_counter: u32,
    was_triggered: bool,
}

/// N-slot pre/post-trigger capture ring for one triggered output signal.
pub struct TriggerRing {
    slots: Vec<Slot>,
    state: Mutex<RingState>,
    event: Event,
    pre: u32,
    post: u32,
    trigger_byte_offset: usize,
    overrun_count: AtomicU64,
    data_source_name: String,
}

impl TriggerRing {
    /// Allocate a ring with `n` slots, each `slot_len` bytes, capturing
    /// `pre` slots before and `post` slots after each trigger edge. The
    /// trigger flag is read from byte `trigger_byte_offset` of each slot.
    pub fn new(n: usize, slot_len: usize, pre: u32, post: u32, trigger_byte_offset: usize, data_source_name: impl Into<String>) -> Arc<Self> {
        let slots = (0..n).map(|_| Slot { bytes: Mutex::new(vec![0u8; slot_len]), triggered: Mutex::new(false) }).collect();
        Arc::new(Self {
            slots,
            state: Mutex::new(RingState { write_idx: 0, read_synch_idx: 0, post_trigger_counter: 0, was_triggered: false }),
            event: Event::new(),
            pre,
            post,
            trigger_byte_offset,
            overrun_count: AtomicU64::new(0),
            data_source_name: data_source_name.into(),
        })
    }

    /// Number of slots the producer has overwritten while still marked
    /// triggered (a consumer-lagging-behind overrun, spec P5).
    pub fn overrun_count(&self) -> u64 {
        self.overrun_count.load(Ordering::Relaxed)
    }

    fn n(&self) -> usize {
        self.slots.len()
    }

    /// Producer side: called from the real-time thread's `execute`.
    #[instrument(skip(self, snapshot), fields(data_source = %self.data_source_name))]
    pub fn produce(&self, snapshot: &[u8]) -> CycleResult<()> {
        let n = self.n();
        let mut state = self.state.lock().expect("trigger ring state poisoned");
        let write_idx = state.write_idx;

        if *self.slots[write_idx].triggered.lock().expect("slot poisoned") {
            self.overrun_count.fetch_add(1, Ordering::Relaxed);
            warn!(slot = write_idx, "trigger ring overrun: consumer has not kept up");
            return Err(CycleError::Overrun(self.data_source_name.clone()));
        }

        self.slots[write_idx].bytes.lock().expect("slot poisoned").copy_from_slice(snapshot);

        let trig = snapshot.get(self.trigger_byte_offset).copied().unwrap_or(0) != 0;

        if trig && !state.was_triggered {
            for i in 1..=self.pre as usize {
                let idx = (write_idx + n - i) % n;
                *self.slots[idx].triggered.lock().expect("slot poisoned") = true;
            }
            state.was_triggered = true;
        }
        if trig {
            state.post_trigger_counter = self.post;
            *self.slots[write_idx].triggered.lock().expect("slot poisoned") = true;
        } else if state.post_trigger_counter > 0 {
            *self.slots[write_idx].triggered.lock().expect("slot poisoned") = true;
            state.post_trigger_counter -= 1;
            state.was_triggered = false;
        }

        state.write_idx = (write_idx + 1) % n;
        self.event.post();
        Ok(())
    }

    /// Consumer side: drain every slot between `read_synch_idx` and
    /// `write_idx - pre` (mod N) that is marked triggered, flushing each
    /// to `data_source` at `data_source_signal` and calling
    /// `data_source.synchronise()` after each delivered slot, per the
    /// consumer algorithm's second step. Returns once caught up.
    fn drain_once(&self, data_source: &dyn DataSource, data_source_signal: usize) -> CycleResult<()> {
        let n = self.n();
        let stop_idx = {
            let state = self.state.lock().expect("trigger ring state poisoned");
            (state.write_idx + n - self.pre as usize) % n
        };
        loop {
            let read_idx = self.state.lock().expect("trigger ring state poisoned").read_synch_idx;
            if read_idx == stop_idx {
                break;
            }
            let was_triggered = {
                let mut flag = self.slots[read_idx].triggered.lock().expect("slot poisoned");
                let was = *flag;
                *flag = false;
                was
            };
            if was_triggered {
                if let Some(addr) = data_source.signal_memory(data_source_signal, 0) {
                    let bytes = self.slots[read_idx].bytes.lock().expect("slot poisoned").clone();
                    data_source.write_bytes(addr, 0, &bytes);
                    data_source.synchronise().map_err(|_| CycleError::SynchroniseFailed(self.data_source_name.clone()))?;
                }
            }
            let mut state = self.state.lock().expect("trigger ring state poisoned");
            state.read_synch_idx = (read_idx + 1) % n;
        }
        Ok(())
    }

    /// Run one consumer iteration: drain, then wait for the next post (or
    /// shutdown). Intended as the `Main` stage of an embedded thread
    /// service hosting this ring's consumer.
    pub fn consume_cycle(&self, data_source: &dyn DataSource, data_source_signal: usize, wait_timeout: Duration) -> CycleResult<()> {
        self.drain_once(data_source, data_source_signal)?;
        match self.event.wait(wait_timeout) {
            Ok(()) => {
                self.event.reset();
                Ok(())
            }
            Err(rtc_concurrency::ConcurrencyError::TimedOut) => Ok(()),
            Err(rtc_concurrency::ConcurrencyError::Cancelled) => Err(CycleError::Cancelled),
            Err(_) => Ok(()),
        }
    }

    /// Close the event, unblocking the consumer so it can be stopped.
    pub fn shutdown(&self) {
        self.event.close();
    }
}

/// Spawn the background consumer for `ring` as an embedded thread service.
/// `Stop()` closes the ring's event so the consumer's blocking wait
/// unblocks on the next poll, per (I-T4).
pub fn spawn_consumer(
    ring: Arc<TriggerRing>,
    data_source: Arc<dyn DataSource>,
    data_source_signal: usize,
    poll_timeout: Duration,
    stop_timeout: Duration,
) -> SingleThreadService {
    let callable = Arc::new(move |stage: ExecutionStage| -> CallableSignal {
        match stage {
            ExecutionStage::StartUp => CallableSignal::Ok,
            ExecutionStage::Main => match ring.consume_cycle(data_source.as_ref(), data_source_signal, poll_timeout) {
                Ok(()) => CallableSignal::Ok,
                Err(CycleError::Cancelled) => CallableSignal::Ok,
                Err(_) => CallableSignal::Fatal,
            },
            ExecutionStage::Termination | ExecutionStage::BadTermination => {
                ring.shutdown();
                CallableSignal::Ok
            }
        }
    });
    SingleThreadService::new(callable, stop_timeout)
}

/// A `TriggerOutput` broker: reads a function's output signal snapshot
/// each cycle and feeds it to a `TriggerRing`, whose background consumer
/// (an embedded `SingleThreadService`) drains triggered slots to the data
/// source.
pub struct TriggerOutputBroker {
    pub ring: Arc<TriggerRing>,
    pub function: Arc<dyn MemoryOwner>,
    pub function_signal: usize,
    pub byte_count: usize,
    scratch: Mutex<Vec<u8>>,
}

impl TriggerOutputBroker {
    /// Build a broker, allocating its `byte_count`-sized scratch buffer
    /// once, up front, so `execute` never allocates on the real-time
    /// thread.
    pub fn new(ring: Arc<TriggerRing>, function: Arc<dyn MemoryOwner>, function_signal: usize, byte_count: usize) -> Self {
        Self { ring, function, function_signal, byte_count, scratch: Mutex::new(vec![0u8; byte_count]) }
    }

    /// Execute the producer side for one cycle.
    pub fn execute(&self) -> CycleResult<()> {
        let Some(addr) = self.function.signal_memory(self.function_signal, 0) else {
            return Err(CycleError::CopyFailed("trigger output function signal unresolved".to_string()));
        };
        let mut scratch = self.scratch.lock().expect("trigger output scratch poisoned");
        self.function.read_bytes(addr, 0, &mut scratch);
        self.ring.produce(&scratch)
    }
}
