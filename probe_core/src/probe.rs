//! Per-probe register set: configuration, filter state, homing and logging.
//!
//! A `ProbeState` is only ever touched through `Shared::lock`, from either the
//! timer callback (`machine`) or a command handler (`table`).

use std::sync::Arc;

use probe_traits::{AdcChannel, TriggerSink};

use crate::buffer::{BUFFER_CAPACITY, SampleBuffer, clamp_window};
use crate::config::{HomingCfg, ProbeCfg, SamplingPolicy};
use crate::estimator::{TareOutcome, adaptive_threshold, baseline};
use crate::fixed_point::{counts_to_wire, multiplier_to_wire, ratio_to_wire};
use crate::telemetry::{Activity, LogSession};
use crate::trigger::is_triggered;
use crate::wire::{EndstopState, LogRecord, ReportResult, TareResult};

/// Homing mode of a probe.
pub(crate) enum Homing {
    /// Timer idle unless logging keeps it alive.
    Off,
    /// Sampling at the rest cadence, never triggering.
    FreeRun,
    Armed {
        sink: Arc<dyn TriggerSink>,
        reason: u8,
    },
}

impl Homing {
    fn is_off(&self) -> bool {
        matches!(self, Homing::Off)
    }
}

pub struct ProbeState {
    pub(crate) oid: u8,
    pub(crate) pin: u8,
    pub(crate) trigger_above: bool,
    pub(crate) trigger_below: bool,
    pub(crate) threshold: f32,
    pub(crate) auto_threshold: bool,
    pub(crate) std_multiplier: f32,
    pub(crate) tare_window: usize,
    pub(crate) adc: Box<dyn AdcChannel>,
    pub(crate) buffer: SampleBuffer,
    pub(crate) tare: f32,
    pub(crate) last_raw: u16,
    pub(crate) homing: Homing,
    pub(crate) sample_ticks: u32,
    pub(crate) rest_ticks: u32,
    pub(crate) required_matches: u8,
    pub(crate) remaining_matches: u8,
    pub(crate) next_wake: u32,
    pub(crate) logging: Option<LogSession>,
    pub(crate) policy: SamplingPolicy,
    pub(crate) oversample_acc: u32,
    pub(crate) oversample_n: u8,
}

impl core::fmt::Debug for ProbeState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProbeState")
            .field("oid", &self.oid)
            .field("pin", &self.pin)
            .field("tare", &self.tare)
            .field("current", &self.buffer.current())
            .field("homing_active", &self.homing_active())
            .field("logging", &self.logging)
            .field("next_wake", &self.next_wake)
            .finish()
    }
}

impl ProbeState {
    /// Fresh probe bound to `adc`. `idle_rest_ticks` is the cadence used by
    /// logging before the probe is first armed.
    pub fn new(
        cfg: &ProbeCfg,
        adc: Box<dyn AdcChannel>,
        policy: SamplingPolicy,
        idle_rest_ticks: u32,
    ) -> Self {
        let cadence = idle_rest_ticks.max(1);
        Self {
            oid: cfg.oid,
            pin: cfg.pin,
            trigger_above: cfg.trigger_above,
            trigger_below: cfg.trigger_below,
            threshold: cfg.threshold,
            auto_threshold: cfg.auto_threshold,
            std_multiplier: cfg.std_multiplier,
            tare_window: clamp_window(cfg.tare_window, BUFFER_CAPACITY),
            adc,
            buffer: SampleBuffer::new(cfg.average_window),
            tare: 0.0,
            last_raw: 0,
            homing: Homing::Off,
            sample_ticks: cadence,
            rest_ticks: cadence,
            required_matches: 0,
            remaining_matches: 0,
            next_wake: 0,
            logging: None,
            policy: normalize(policy),
            oversample_acc: 0,
            oversample_n: 0,
        }
    }

    /// Trigger predicate as seen by queries and the homing path. False until
    /// the average is defined and a non-zero tare exists.
    pub fn trigger_predicate(&self) -> bool {
        match self.buffer.current() {
            Some(current) if self.tare != 0.0 => is_triggered(
                current,
                self.tare,
                self.threshold,
                self.trigger_above,
                self.trigger_below,
            ),
            _ => false,
        }
    }

    /// Armed with a trigger sink.
    pub fn homing_active(&self) -> bool {
        matches!(self.homing, Homing::Armed { .. })
    }

    pub fn timer_active(&self) -> bool {
        !self.homing.is_off() || self.logging.is_some()
    }

    pub fn activity(&self) -> Activity {
        Activity {
            timer: self.timer_active(),
            logging: self.logging.is_some(),
        }
    }

    /// Abort the in-flight conversion and any partial oversample.
    pub(crate) fn halt_sampling(&mut self) {
        self.adc.cancel();
        self.oversample_acc = 0;
        self.oversample_n = 0;
    }

    /// Stop homing and logging. The caller has already cancelled the timer.
    pub(crate) fn disarm(&mut self) {
        self.halt_sampling();
        self.homing = Homing::Off;
        self.logging = None;
    }

    /// Apply an arm request with a non-zero debounce count. `sink` is required
    /// when `cfg.target` is set. Returns the first wake time.
    pub(crate) fn arm(&mut self, cfg: &HomingCfg, sink: Option<Arc<dyn TriggerSink>>) -> u32 {
        self.halt_sampling();
        self.buffer.reset();
        self.sample_ticks = cfg.sample_ticks.max(1);
        self.rest_ticks = cfg.rest_ticks.max(1);
        self.required_matches = cfg.debounce_count;
        self.remaining_matches = cfg.debounce_count;
        self.next_wake = cfg.start_clock;
        self.homing = match sink {
            Some(sink) if cfg.target => Homing::Armed {
                sink,
                reason: cfg.trigger_reason,
            },
            _ => Homing::FreeRun,
        };
        self.next_wake
    }

    /// Recompute the tare (and the threshold in auto mode) from the newest
    /// `tare_window` readings.
    pub fn do_tare(&mut self) -> TareOutcome {
        let Some(b) = baseline(&self.buffer, self.tare_window) else {
            return TareOutcome::Insufficient {
                have: self.buffer.len(),
                need: self.tare_window,
            };
        };
        if b.tare == 0.0 {
            self.tare = 0.0;
            tracing::warn!(oid = self.oid, "tare window averaged to zero");
            return TareOutcome::ZeroTare;
        }
        self.tare = b.tare;
        let threshold = if self.auto_threshold {
            adaptive_threshold(&b, self.std_multiplier)
        } else {
            None
        };
        if let Some(t) = threshold {
            self.threshold = t;
        }
        TareOutcome::Updated {
            tare: b.tare,
            threshold,
        }
    }

    /// A manual threshold switches auto mode off; in auto mode only the
    /// multiplier is taken and applies from the next tare.
    pub fn set_threshold(&mut self, threshold: f32, auto: bool, std_multiplier: f32) {
        if auto {
            self.auto_threshold = true;
            self.std_multiplier = std_multiplier;
        } else {
            self.threshold = threshold;
            self.auto_threshold = false;
        }
    }

    /// Resize both windows and forget every buffered reading.
    pub fn update_buffer(&mut self, tare_window: u32, average_window: u32) {
        self.tare_window = clamp_window(tare_window, BUFFER_CAPACITY);
        self.buffer.reset();
        self.buffer.set_average_window(average_window);
        self.oversample_acc = 0;
        self.oversample_n = 0;
    }

    pub fn set_policy(&mut self, policy: SamplingPolicy) {
        self.policy = normalize(policy);
        self.oversample_acc = 0;
        self.oversample_n = 0;
    }

    /// Consistent copy of every reportable field.
    pub fn snapshot(&self) -> ProbeSnapshot {
        ProbeSnapshot {
            oid: self.oid,
            raw: self.last_raw,
            current: self.buffer.current(),
            tare: self.tare,
            threshold: self.threshold,
            auto_threshold: self.auto_threshold,
            std_multiplier: self.std_multiplier,
            tare_window: self.tare_window,
            average_window: self.buffer.average_window(),
            homing_active: self.homing_active(),
            next_wake: self.next_wake,
            trigger_predicate: self.trigger_predicate(),
            buffered: self.buffer.len(),
            logging: self.logging.is_some(),
        }
    }
}

fn normalize(policy: SamplingPolicy) -> SamplingPolicy {
    SamplingPolicy {
        oversample: policy.oversample.max(1),
        ..policy
    }
}

/// Point-in-time copy of a probe, taken inside one critical section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeSnapshot {
    pub oid: u8,
    pub raw: u16,
    pub current: Option<f32>,
    pub tare: f32,
    pub threshold: f32,
    pub auto_threshold: bool,
    pub std_multiplier: f32,
    pub tare_window: usize,
    pub average_window: usize,
    pub homing_active: bool,
    pub next_wake: u32,
    pub trigger_predicate: bool,
    pub buffered: usize,
    pub logging: bool,
}

impl ProbeSnapshot {
    fn current_scaled(&self) -> u32 {
        self.current.map_or(0, counts_to_wire)
    }

    pub fn endstop_state(&self) -> EndstopState {
        EndstopState {
            oid: self.oid,
            homing_active: self.homing_active,
            next_wake_clock: self.next_wake,
            trigger_predicate: self.trigger_predicate,
        }
    }

    pub fn tare_result(&self) -> TareResult {
        TareResult {
            oid: self.oid,
            tare_scaled: counts_to_wire(self.tare),
            threshold_scaled: ratio_to_wire(self.threshold),
            auto_threshold: self.auto_threshold,
            std_multiplier_scaled: multiplier_to_wire(self.std_multiplier),
        }
    }

    pub fn report(&self) -> ReportResult {
        ReportResult {
            oid: self.oid,
            raw: self.raw,
            current_scaled: self.current_scaled(),
            tare_scaled: counts_to_wire(self.tare),
            threshold_scaled: ratio_to_wire(self.threshold),
            auto_threshold: self.auto_threshold,
            std_multiplier_scaled: multiplier_to_wire(self.std_multiplier),
            tare_window: self.tare_window as u32,
            average_window: self.average_window as u32,
        }
    }

    pub fn log_record(&self, timestamp: u32, finished: bool) -> LogRecord {
        LogRecord {
            oid: self.oid,
            timestamp,
            raw: self.raw,
            current_scaled: self.current_scaled(),
            tare_scaled: counts_to_wire(self.tare),
            threshold_scaled: ratio_to_wire(self.threshold),
            auto_threshold: self.auto_threshold,
            std_multiplier_scaled: multiplier_to_wire(self.std_multiplier),
            tare_window: self.tare_window as u32,
            average_window: self.average_window as u32,
            trigger_predicate: self.trigger_predicate,
            finished,
        }
    }
}
