//! The sampling state machine: one ADC conversion per timer callback.
//!
//! Each tick starts a conversion (rescheduling while the channel is busy),
//! feeds the buffer, runs the debounce policy when armed, emits telemetry and
//! decides between rescheduling and stopping. Every reschedule is the previous
//! wake time plus an interval, so the cadence never drifts with callback
//! latency.

use std::sync::Arc;

use probe_traits::{SampleStatus, TimerAction, TriggerSink};

use crate::config::DebouncePolicy;
use crate::probe::{Homing, ProbeState};
use crate::wire::LogRecord;

/// A trigger owed to a sink. The probe has already left homing when this is
/// produced; the caller delivers it after releasing the register set.
#[derive(Clone)]
pub struct Trigger {
    pub sink: Arc<dyn TriggerSink>,
    pub reason: u8,
}

impl Trigger {
    pub fn deliver(self) {
        self.sink.notify(self.reason);
    }
}

impl core::fmt::Debug for Trigger {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Trigger")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

/// Outcome of one timer callback.
#[derive(Debug, Clone)]
pub struct Tick {
    pub action: TimerAction,
    /// Telemetry record to forward to the host.
    pub log: Option<LogRecord>,
    pub trigger: Option<Trigger>,
}

impl Tick {
    fn done(log: Option<LogRecord>) -> Self {
        Self {
            action: TimerAction::Done,
            log,
            trigger: None,
        }
    }
}

/// What the debounce policy decided for one reading.
enum Verdict {
    Fire,
    Recheck,
    Rest,
}

impl ProbeState {
    /// Run the callback scheduled for `waketime`.
    pub fn on_tick(&mut self, waketime: u32) -> Tick {
        if !self.timer_active() || waketime != self.next_wake {
            tracing::trace!(oid = self.oid, waketime, "stale probe timer dropped");
            return Tick::done(None);
        }

        if let SampleStatus::Busy(delay) = self.adc.begin_sample() {
            // A stalled channel must not hold a stream past its deadline.
            let log = self.close_expired_log(waketime);
            if !self.timer_active() {
                self.halt_sampling();
                return Tick::done(log);
            }
            return self.reschedule(waketime, delay.max(self.rest_ticks), log);
        }
        let raw = self.adc.read();
        self.last_raw = raw;

        let Some(reading) = self.oversampled(raw) else {
            return self.reschedule(waketime, self.sample_ticks, None);
        };
        self.buffer.push(reading);
        tracing::trace!(
            oid = self.oid,
            waketime,
            raw,
            reading,
            current = ?self.buffer.current(),
            "probe sample"
        );

        let verdict = match self.homing {
            Homing::Armed { .. } => self.debounce(),
            _ => Verdict::Rest,
        };

        if let Verdict::Fire = verdict {
            let trigger = match std::mem::replace(&mut self.homing, Homing::Off) {
                Homing::Armed { sink, reason } => {
                    tracing::debug!(oid = self.oid, waketime, reason, "probe triggered");
                    Some(Trigger { sink, reason })
                }
                _ => None,
            };
            let log = self
                .logging
                .take()
                .map(|_| self.snapshot().log_record(waketime, true));
            return Tick {
                action: TimerAction::Done,
                log,
                trigger,
            };
        }

        let mut log = None;
        if let Some(session) = self.logging {
            let finished = session.ends_at(waketime, self.buffer.len(), self.tare_window);
            if finished {
                self.logging = None;
            }
            log = Some(self.snapshot().log_record(waketime, finished));
        }

        if !self.timer_active() {
            return Tick::done(log);
        }
        let interval = match verdict {
            Verdict::Recheck => self.sample_ticks,
            _ => self.rest_ticks,
        };
        self.reschedule(waketime, interval, log)
    }

    fn reschedule(&mut self, waketime: u32, interval: u32, log: Option<LogRecord>) -> Tick {
        self.next_wake = waketime.wrapping_add(interval);
        Tick {
            action: TimerAction::Reschedule(self.next_wake),
            log,
            trigger: None,
        }
    }

    /// End the log session if its deadline has passed without a reading,
    /// returning the closing record.
    fn close_expired_log(&mut self, waketime: u32) -> Option<LogRecord> {
        let session = self.logging?;
        if !session.ends_at(waketime, self.buffer.len(), self.tare_window) {
            return None;
        }
        self.logging = None;
        Some(self.snapshot().log_record(waketime, true))
    }

    /// Accumulate one conversion; yields the rounded mean once the policy's
    /// oversample count is reached.
    fn oversampled(&mut self, raw: u16) -> Option<u16> {
        let n = self.policy.oversample;
        if n <= 1 {
            return Some(raw);
        }
        self.oversample_acc += u32::from(raw);
        self.oversample_n += 1;
        if self.oversample_n < n {
            return None;
        }
        let count = u32::from(self.oversample_n);
        let mean = (self.oversample_acc + count / 2) / count;
        self.oversample_acc = 0;
        self.oversample_n = 0;
        // Mean of u16 values fits in u16.
        Some(u16::try_from(mean).unwrap_or(u16::MAX))
    }

    fn debounce(&mut self) -> Verdict {
        if self.trigger_predicate() {
            self.remaining_matches = self.remaining_matches.saturating_sub(1);
            if self.remaining_matches == 0 {
                Verdict::Fire
            } else {
                Verdict::Recheck
            }
        } else {
            match self.policy.debounce {
                DebouncePolicy::ResetOnMiss => {
                    self.remaining_matches = self.required_matches;
                    Verdict::Rest
                }
                DebouncePolicy::Accumulate if self.remaining_matches < self.required_matches => {
                    Verdict::Recheck
                }
                DebouncePolicy::Accumulate => Verdict::Rest,
            }
        }
    }
}
