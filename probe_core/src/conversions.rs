//! `From` implementations bridging `probe_config` sections to core types,
//! and core configuration to the host commands that carry it.

use crate::config::{DebouncePolicy, HomingCfg, ProbeCfg, SamplingPolicy, TableCfg};
use crate::fixed_point::{multiplier_to_wire, ratio_to_wire};
use crate::wire::Command;

// ── ProbeCfg ─────────────────────────────────────────────────────────────────

impl From<&probe_config::ProbeSection> for ProbeCfg {
    fn from(c: &probe_config::ProbeSection) -> Self {
        Self {
            oid: c.oid,
            pin: c.pin,
            trigger_above: c.trigger_above,
            trigger_below: c.trigger_below,
            threshold: c.threshold,
            auto_threshold: c.auto_threshold,
            std_multiplier: c.std_multiplier,
            tare_window: c.tare_window,
            average_window: c.average_window,
        }
    }
}

// ── SamplingPolicy ───────────────────────────────────────────────────────────

impl From<probe_config::DebounceMode> for DebouncePolicy {
    fn from(m: probe_config::DebounceMode) -> Self {
        match m {
            probe_config::DebounceMode::Reset => DebouncePolicy::ResetOnMiss,
            probe_config::DebounceMode::Accumulate => DebouncePolicy::Accumulate,
        }
    }
}

impl From<&probe_config::PolicySection> for SamplingPolicy {
    fn from(c: &probe_config::PolicySection) -> Self {
        Self {
            debounce: c.debounce.into(),
            oversample: c.oversample,
        }
    }
}

// ── TableCfg ─────────────────────────────────────────────────────────────────

impl From<&probe_config::ClockSection> for TableCfg {
    fn from(c: &probe_config::ClockSection) -> Self {
        Self {
            idle_rest_ticks: c.idle_rest_ticks,
        }
    }
}

// ── HomingCfg ────────────────────────────────────────────────────────────────

impl HomingCfg {
    /// Arm request for the probe in `cfg`, first sampling at `start_clock`.
    pub fn from_config(cfg: &probe_config::Config, start_clock: u32) -> Self {
        Self {
            oid: cfg.probe.oid,
            start_clock,
            sample_ticks: cfg.homing.sample_ticks,
            debounce_count: cfg.homing.debounce_count,
            rest_ticks: cfg.homing.rest_ticks,
            target: true,
            sink_oid: cfg.homing.sink_oid,
            trigger_reason: cfg.homing.trigger_reason,
        }
    }
}

// ── Host commands ────────────────────────────────────────────────────────────

impl From<&ProbeCfg> for Command {
    fn from(c: &ProbeCfg) -> Self {
        Command::Configure {
            oid: c.oid,
            pin: c.pin,
            trigger_above: c.trigger_above,
            trigger_below: c.trigger_below,
            threshold_raw: ratio_to_wire(c.threshold),
            auto_threshold: c.auto_threshold,
            std_multiplier_raw: multiplier_to_wire(c.std_multiplier),
            tare_window: c.tare_window,
            average_window: c.average_window,
        }
    }
}

impl From<&HomingCfg> for Command {
    fn from(c: &HomingCfg) -> Self {
        Command::ArmForHoming {
            oid: c.oid,
            start_clock: c.start_clock,
            sample_ticks: c.sample_ticks,
            debounce_count: c.debounce_count,
            rest_ticks: c.rest_ticks,
            target: c.target,
            sink_oid: c.sink_oid,
            trigger_reason: c.trigger_reason,
        }
    }
}
