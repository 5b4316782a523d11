//! Virtual time base and a deterministic timer queue.
//!
//! `SimScheduler` stands in for the firmware timer dispatcher: it keeps one
//! pending wake time per `TimerId`, and `run_next` jumps the virtual clock to
//! the earliest one and invokes the handler, honouring the returned
//! `TimerAction`. No real time passes.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use probe_traits::{Scheduler, TickClock, TimerAction, TimerHandler, TimerId, is_before};

/// Manually driven tick counter.
#[derive(Debug, Clone)]
pub struct VirtualClock {
    ticks: Arc<AtomicU32>,
    freq_hz: u32,
}

impl VirtualClock {
    pub fn new(freq_hz: u32) -> Self {
        Self {
            ticks: Arc::new(AtomicU32::new(0)),
            freq_hz: freq_hz.max(1),
        }
    }

    pub fn set(&self, ticks: u32) {
        self.ticks.store(ticks, Ordering::SeqCst);
    }

    pub fn advance(&self, ticks: u32) {
        self.ticks.fetch_add(ticks, Ordering::SeqCst);
    }
}

impl TickClock for VirtualClock {
    fn now(&self) -> u32 {
        self.ticks.load(Ordering::SeqCst)
    }

    fn freq_hz(&self) -> u32 {
        self.freq_hz
    }
}

#[derive(Debug)]
pub struct SimScheduler {
    clock: VirtualClock,
    pending: Mutex<Vec<(TimerId, u32)>>,
}

impl SimScheduler {
    pub fn new(clock: VirtualClock) -> Self {
        Self {
            clock,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn clock(&self) -> &VirtualClock {
        &self.clock
    }

    fn queue(&self) -> MutexGuard<'_, Vec<(TimerId, u32)>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wake time currently armed for `timer`.
    pub fn pending(&self, timer: TimerId) -> Option<u32> {
        self.queue()
            .iter()
            .find(|(id, _)| *id == timer)
            .map(|(_, t)| *t)
    }

    pub fn is_idle(&self) -> bool {
        self.queue().is_empty()
    }

    /// Pop the earliest pending timer (relative to the current virtual time).
    fn pop_earliest(&self) -> Option<(TimerId, u32)> {
        let now = self.clock.now();
        let mut q = self.queue();
        let idx = q
            .iter()
            .enumerate()
            .min_by_key(|(_, (_, t))| t.wrapping_sub(now) as i32)
            .map(|(i, _)| i)?;
        Some(q.swap_remove(idx))
    }

    /// Dispatch the earliest pending timer. Returns the tick it ran at, or
    /// `None` when nothing is scheduled.
    pub fn run_next(&self, handler: &dyn TimerHandler) -> Option<u32> {
        let (timer, waketime) = self.pop_earliest()?;
        if is_before(self.clock.now(), waketime) {
            self.clock.set(waketime);
        }
        // The queue lock is released here: the handler may schedule or cancel.
        match handler.on_timer(timer, waketime) {
            TimerAction::Reschedule(next) => {
                let mut q = self.queue();
                if !q.iter().any(|(id, _)| *id == timer) {
                    q.push((timer, next));
                }
            }
            TimerAction::Done => {
                tracing::trace!(timer = timer.0, waketime, "sim timer done");
            }
        }
        Some(waketime)
    }

    /// Dispatch every timer due at or before `until`, then move the clock to
    /// `until`. Returns the number of callbacks run.
    pub fn run_until(&self, handler: &dyn TimerHandler, until: u32) -> usize {
        let mut runs = 0;
        loop {
            let due = {
                let now = self.clock.now();
                self.queue()
                    .iter()
                    .map(|(_, t)| *t)
                    .min_by_key(|t| t.wrapping_sub(now) as i32)
                    .filter(|t| !is_before(until, *t))
            };
            if due.is_none() {
                break;
            }
            self.run_next(handler);
            runs += 1;
        }
        if is_before(self.clock.now(), until) {
            self.clock.set(until);
        }
        runs
    }
}

impl Scheduler for SimScheduler {
    fn schedule(&self, timer: TimerId, waketime: u32) {
        let mut q = self.queue();
        q.retain(|(id, _)| *id != timer);
        q.push((timer, waketime));
    }

    fn cancel(&self, timer: TimerId) {
        self.queue().retain(|(id, _)| *id != timer);
    }
}
